mod block;
pub mod config;
mod edit;
mod error;
pub mod extract;
mod headings;
mod inline;
mod markdown;
pub mod memory;
mod parser;
mod plan;
mod range;
pub mod service;
mod tabs;
mod tools;
pub mod tree;

pub use block::{Block, BlockKind, InlineStyle, Segment};
pub use config::Config;
pub use edit::EditOperation;
pub use error::{Error, NotFoundKind, Result, ToolError};
pub use headings::{Heading, find_headings, sections};
pub use inline::parse_inline;
pub use memory::MemoryService;
pub use parser::parse;
pub use plan::{Anchor, Plan, Planner};
pub use range::IndexRange;
pub use service::{DocumentService, ServiceError};
pub use tabs::{Target, resolve as resolve_tab};
pub use tools::{ReplaceSection, Session, StyledRange, WriteStatus};
