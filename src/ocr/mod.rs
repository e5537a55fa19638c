pub mod poppler;
pub mod vision;

pub use poppler::PopplerRasterizer;
pub use vision::VisionOcr;
