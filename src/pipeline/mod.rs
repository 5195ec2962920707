//! Pipeline stages for layout reconstruction.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different PDF backend) without touching the
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ classify ──▶ assemble
//! (geometry)  (thresholds   (markdown
//!  + encode    + line         tokens)
//!  (images)    typing)
//! ```
//!
//! 1. [`extract`]  — pull lines, tables, and image regions out of the
//!    backend and normalise their geometry; encode image crops when the
//!    image flag is set (the only stage allowed to record recoverable
//!    errors)
//! 2. [`classify`] — derive batch-wide thresholds from the height/gap
//!    distributions, then tag every line as title, subtitle, or a member
//!    of a numbered paragraph cluster
//! 3. [`assemble`] — walk the typed lines in order, emitting Markdown and
//!    interleaving tables and image references at their document position
//! 4. [`encode`]   — `DynamicImage` → base64 PNG data URI, used by
//!    extract for each cropped image region

pub mod assemble;
pub mod classify;
pub mod encode;
pub mod extract;
