pub mod destination;
pub mod source;

pub use destination::{action_html, ActionValue, Entry, EntryFields, TranslationDocument};
pub use source::{
    Bilingual, FeatureId, FeatureList, SourceEntity, SourceEnvelope, Sources, SubFeature, TextField,
};
