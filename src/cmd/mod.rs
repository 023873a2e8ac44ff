//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module     | Command handled                               |
//! |------------|-----------------------------------------------|
//! | `generate` | `Generate` — batch sketch generation          |
//! | `video`    | `Video` — long-running video job              |
//! | `render`   | `Render` — sandboxed execution with statuses  |
//! | `export`   | `Export` — self-contained HTML bundle         |
//! | `addons`   | `Addons` — list the addon catalog             |

pub mod addons;
pub mod export;
pub mod generate;
pub mod render;
pub mod video;

pub use addons::cmd_addons;
pub use export::cmd_export;
pub use generate::cmd_generate;
pub use render::cmd_render;
pub use video::cmd_video;
