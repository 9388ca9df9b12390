//! Built-in components
//!
//! Each renderable component kind comes with a provider resource that turns
//! it into render list data. Register the providers next to the components:
//!
//! ```rust,ignore
//! resources.add::<MeshRendererProvider>()?;
//! resources.add::<CameraProvider>()?;
//! ```

mod camera;
mod mesh_renderer;
mod render_source;
mod transform;

pub use camera::{Camera, CameraProvider};
pub use mesh_renderer::{MeshRenderer, MeshRendererProvider};
pub use render_source::RenderSource;
pub use transform::TransformComponent;
