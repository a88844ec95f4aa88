//! Layered config loading.
//!
//! A config key such as `database` resolves to the deep merge of every
//! `database.<ext>` file found along a search path. The search path is built
//! from ordered roots and overlay axes (for example `environment=prod` maps to
//! `<root>/prod`); later overlays take precedence over earlier ones.
//!
//! ```no_run
//! use overlay_config::Config;
//!
//! let config = Config::build(|settings| {
//!     settings
//!         .set_root("config")
//!         .define_overlay("default", None)
//!         .define_overlay("environment", Some("prod"))
//!         .define_overlay("country", Some("US"))
//!         .define_combined_overlay("environment", "country")?;
//!     Ok(())
//! })?;
//!
//! // Merges config/values.yml, config/prod/values.yml, config/US/values.yml
//! // and config/prod_US/values.yml, in that order.
//! let values = config.get("values")?;
//! # Ok::<(), overlay_config::ConfigError>(())
//! ```

pub mod error;
pub mod handlers;
pub mod loader;
pub mod logging;
pub mod merge;
pub mod options;
pub mod overlay;
pub mod search_path;
pub mod settings;
pub mod store;
pub mod template;

pub use error::{ConfigError, Result};
pub use handlers::{Handler, HandlerRegistry, ParseFn};
pub use options::LoaderOptions;
pub use overlay::{Overlay, OverlaySet, OverlayValue};
pub use settings::Settings;
pub use store::Config;
