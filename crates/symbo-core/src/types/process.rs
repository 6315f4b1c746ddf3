//! Processes described by a crash report.

use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use super::{Architecture, BinaryImage, BinaryUuid, StackFrame};

/// One `Process:` section of a crash report
///
/// Owns its binary images and stack frames. Frames share their image through
/// an `Arc`, so the images live exactly as long as the process does.
#[derive(Debug, Clone)]
pub struct ReportProcess
{
    /// Process name from the `Process:` header
    pub name: Option<String>,
    /// Architecture from the `Code Type:` header, if one was found
    pub architecture: Option<Architecture>,
    /// Every image listed under `Binary Images:`
    pub binary_images: Vec<Arc<BinaryImage>>,
    /// Every frame line that could be bound to one of `binary_images`
    pub stack_frames: Vec<StackFrame>,
}

impl ReportProcess
{
    /// Assemble a process from parsed parts.
    pub fn new(
        name: Option<String>,
        architecture: Option<Architecture>,
        binary_images: Vec<Arc<BinaryImage>>,
        stack_frames: Vec<StackFrame>,
    ) -> Self
    {
        Self {
            name,
            architecture,
            binary_images,
            stack_frames,
        }
    }

    /// Name for log messages.
    pub fn display_name(&self) -> &str
    {
        self.name.as_deref().unwrap_or("<null>")
    }

    /// Distinct images referenced by at least one stack frame.
    ///
    /// Images that only appear in the `Binary Images:` list are not needed.
    pub fn binaries_for_symbolication(&self) -> Vec<&BinaryImage>
    {
        let mut seen = HashSet::new();
        self.stack_frames
            .iter()
            .map(StackFrame::binary_image)
            .filter(|image| seen.insert(*image))
            .collect()
    }

    /// Distinct UUIDs referenced by at least one stack frame, sorted.
    pub fn uuids_for_symbolication(&self) -> BTreeSet<BinaryUuid>
    {
        self.stack_frames.iter().map(|frame| frame.binary_image().uuid).collect()
    }
}
