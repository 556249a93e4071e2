//! Where fonts come from and which one draws what
//!
//! The [`FontRegistry`] loads every face it is pointed at, remembers what each
//! one covers, and answers two questions for the rest of the engine:
//! "which face of this family fits best?" ([`FontRegistry::resolve`]) and
//! "who else can draw this character?" ([`FontRegistry::fallback_for`]).
//!
//! ```
//! use mixtype_core::{FontMetrics, FontStyle, Script};
//! use mixtype_fontdb::{synthetic_face, FontRegistry};
//! use mixtype_unicode::TextAnalyzer;
//!
//! let analyzer = TextAnalyzer::new();
//! let registry = FontRegistry::builder()
//!     .add_face(synthetic_face("Latin", "abc", 500.0, FontMetrics::default(), &analyzer).build())
//!     .add_face(synthetic_face("Khmer", "ក", 600.0, FontMetrics::default(), &analyzer).build())
//!     .build();
//!
//! let latin = registry.resolve("latin", FontStyle::Normal, 400, None).unwrap();
//! let khmer = registry.fallback_for('ក', &latin).unwrap();
//! assert_eq!(khmer.family(), "Khmer");
//! assert_eq!(registry.fallback_chain_for(Script::Khmer).len(), 1);
//! ```

pub mod font;
pub mod loader;
pub mod registry;

pub use font::Font;
pub use loader::{load_data, load_file, synthetic_face};
pub use registry::{FontRegistry, FontRegistryBuilder};
