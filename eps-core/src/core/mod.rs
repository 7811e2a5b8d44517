pub mod embedded_raster;
pub mod error;
pub mod export;
pub mod native;
pub mod operand;
pub mod prescan;
pub mod renderer;
pub mod tokenizer;

pub use embedded_raster::{extract_embedded_raster, is_image_based};
pub use error::{EpsError, EpsResult};
pub use export::{BatchExport, ExportFormat, JPEG_QUALITY};
pub use native::{GhostscriptEngine, NativeEngine, NoNativeEngine};
pub use operand::{Operand, OperandStack};
pub use prescan::{
    BoundingBox, DocumentMetadata, MetadataKey, PrescanOptions, PrescanResult, is_valid_eps,
    prescan, prescan_reader,
};
pub use renderer::{EpsRenderer, RenderOptions, RenderTier, Rendered, target_dimensions};
pub use tokenizer::{Operator, Token, tokenize};
