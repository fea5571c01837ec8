//! Hooks that let extensions replace or decorate the export of an entity.
//!
//! For each entity the session first offers the export to every registered
//! extension in registration order; the first one returning an index takes
//! over and the built-in export is skipped. After the entity has an index,
//! every extension's post hook runs, whether or not one of them took over.

use std::rc::Rc;

use crate::error::ExportResult;
use crate::export::ExportSession;
use crate::material::TextureRef;
use crate::scene::{ClipId, MaterialId, MeshId, NodeId};

#[allow(unused_variables)]
pub trait Extension {
    /// Name written to `extensionsUsed`.
    fn name(&self) -> &str;

    fn export_node(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_node(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }

    fn export_material(
        &self,
        session: &mut ExportSession<'_>,
        material: MaterialId,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_material(
        &self,
        session: &mut ExportSession<'_>,
        material: MaterialId,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }

    fn export_texture(
        &self,
        session: &mut ExportSession<'_>,
        texture: TextureRef,
        normal_map: bool,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_texture(
        &self,
        session: &mut ExportSession<'_>,
        texture: TextureRef,
        normal_map: bool,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }

    fn export_mesh(
        &self,
        session: &mut ExportSession<'_>,
        mesh: MeshId,
        material: Option<usize>,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_mesh(
        &self,
        session: &mut ExportSession<'_>,
        mesh: MeshId,
        material: Option<usize>,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }

    /// `node` is the node whose renderer carries the skin.
    fn export_skin(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_skin(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }

    /// `node` is the node whose animator plays `clip`.
    fn export_animation(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
        clip: ClipId,
    ) -> ExportResult<Option<usize>> {
        Ok(None)
    }

    fn post_export_animation(
        &self,
        session: &mut ExportSession<'_>,
        node: NodeId,
        clip: ClipId,
        index: usize,
    ) -> ExportResult<()> {
        Ok(())
    }
}

/// Registered extensions in registration order.
///
/// Cheap to clone, the session clones the chain before dispatching so that
/// hooks can borrow the session mutably.
#[derive(Clone, Default)]
pub struct ExtensionChain {
    handlers: Vec<Rc<dyn Extension>>,
}

impl ExtensionChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Rc<dyn Extension>) {
        self.handlers.push(extension);
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// First index returned by `hook`, stopping at the first extension that
    /// handles the entity.
    pub fn try_override(
        &self,
        mut hook: impl FnMut(&dyn Extension) -> ExportResult<Option<usize>>,
    ) -> ExportResult<Option<usize>> {
        for handler in &self.handlers {
            if let Some(index) = hook(handler.as_ref())? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    /// Runs `hook` for every extension.
    pub fn notify(
        &self,
        mut hook: impl FnMut(&dyn Extension) -> ExportResult<()>,
    ) -> ExportResult<()> {
        for handler in &self.handlers {
            hook(handler.as_ref())?;
        }
        Ok(())
    }
}
