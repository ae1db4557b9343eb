//! Tastegen Core
//!
//! Host-side orchestration around the streaming core.
//!
//! # Components
//!
//! - [`ScreenOrchestrator`]: one session per UI screen, bounded fan-out,
//!   all-complete barrier
//! - [`OrchestratorConfig`]: TOML / JSON configuration
//! - [`VerdictCache`]: bounded per-session memo of validation verdicts
//! - [`replay`]: replaying recorded generator output
//!
//! # Example
//!
//! ```rust,no_run
//! use tastegen_core::{OrchestratorConfig, ScreenJob, ScreenOrchestrator};
//!
//! # async fn example() -> tastegen_core::Result<()> {
//! let orchestrator = ScreenOrchestrator::new(OrchestratorConfig::default())?;
//! let chunks = futures::stream::iter(vec![Ok::<_, std::convert::Infallible>(
//!     "export default function Home() { return null; }".to_string(),
//! )]);
//! let outcomes = orchestrator.run_all(vec![ScreenJob::new("home", chunks)], None).await?;
//! println!("{:?}", outcomes[0].final_text());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod replay;
pub mod types;

pub use cache::{CacheStats, VerdictCache};
pub use config::OrchestratorConfig;
pub use error::{OrchestratorError, Result};
pub use orchestrator::{ForwardingSink, ScreenOrchestrator};
pub use types::{ScreenEvent, ScreenJob, SessionId, SessionOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
