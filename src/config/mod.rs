//! # Configuration Module
//!
//! Settings are layered, later sources winning:
//! 1. built-in defaults
//! 2. `config/default.toml`, then `config/{RUN_ENV}.toml`
//! 3. `APP__SECTION__KEY` environment variables (a `.env` file is read first)
//! 4. `SERVER_HOST`, `SERVER_PORT`, `DATABASE_URL`, `REDIS_URL`, `JWT_SECRET`
//!
//! ```rust,ignore
//! use chat_delivery::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Listening on {}", settings.server_addr());
//! ```

mod settings;

pub use settings::*;
