//! Everything written under the public directory.
//!
//! # Submodules
//!
//! - [`rss`]: Creates and appends to the podcast feed (`podcast.xml`)
//! - [`markdown`]: Renders post pages and reads their front matter back
//! - [`json`]: Rebuilds the site index (`index.json`) from the posts
//!
//! # Output Structure
//!
//! ```text
//! public/
//! ├── podcast.xml
//! ├── index.json
//! ├── posts/
//! │   └── 20240305-2401.12345v2.md
//! └── episodes/
//!     └── 20240305-2401.12345v2.mp3
//! ```

pub mod json;
pub mod markdown;
pub mod rss;
