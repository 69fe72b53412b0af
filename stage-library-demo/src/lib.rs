pub mod data {
    pub mod definitions;
}
mod stage_library;

pub use stage_library::{
    definitions, icon, icon_content_type, StageLibraryChain, StageLibraryChainBuilder,
};
