//! parkive library: image source management and transactional publishing for
//! a notes archive.
//!
//! Notes embed images from interchangeable hosting locations ("sources"). The
//! library covers three jobs:
//!
//! 1. **Sources**: register and remove named base URLs (`scheme://host[:port]`)
//! 2. **Rewriting**: move markdown and HTML image references from one base URL
//!    to another without touching any other byte, and count references per source
//! 3. **Publishing**: amend and force-push the archive through git, rolling the
//!    local branch back if any step fails
//!
//! # Example
//!
//! ```no_run
//! use parkive::{config, rewriter, scope, sources::Sources};
//!
//! let root = config::locate_project_root().unwrap();
//! let config = config::Config::load(&root).unwrap();
//! let sources = Sources::load(&root).unwrap();
//!
//! let files = scope::files_to_process(&root, &config.scope(None), None).unwrap();
//! let stats = rewriter::rewrite_files(
//!     &files,
//!     sources.require("old").unwrap(),
//!     sources.require("new").unwrap(),
//! )
//! .unwrap();
//!
//! println!("replaced {} urls in {} files", stats.replacements, stats.changed_files);
//! ```

pub mod config;
pub mod error;
pub mod git;
pub mod prefix;
pub mod publish;
pub mod rewriter;
pub mod scanner;
pub mod scope;
pub mod sources;
pub mod wordcount;

// Re-export commonly used types at crate root
pub use error::{ParkiveError, Result};
pub use publish::{PublishFailure, PublishReport, Publisher};
pub use rewriter::{RewriteResult, count_matches, replace_references};
pub use scanner::Reference;
