//! Crash report text grammar.
//!
//! The parser is line oriented and deliberately strict about frame lines: a
//! line is a frame only if it has the full
//! `<index> <image> <address> <target> + <offset>` shape. Anything else in the
//! report (thread headers, register dumps, already-symbolicated frames) is
//! ignored.
//!
//! ```text
//! Process:               MyApp [4242]
//! Code Type:             ARM-64 (Native)
//!
//! Thread 0 Crashed:
//! 0   MyApp                 0x0000000104c8f1d0 0x104c8c000 + 12752
//!
//! Binary Images:
//!        0x104c8c000 -        0x104c93fff MyApp arm64  <6a8cb81345f63652ad33778fd1eab196> /private/var/MyApp.app/MyApp
//! ```

use std::collections::HashMap;
use std::ops::Range;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::image::parse_hex;
use crate::types::{Architecture, BinaryImage, BinaryUuid, ReportProcess, StackFrame};

static PROCESS_START: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^Process:").expect("valid regex"));

static PROCESS_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^Process:[ \t]*(.+?)[ \t]*\[").expect("valid regex"));

static ARCHITECTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^(?:Code Type|Architecture):[ \t]*([^\s(]+)").expect("valid regex"));

static FRAME_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?im)^\d+[ \t]+(.+?)[ \t]+(0x[0-9a-f]+)[ \t]+(.+?)[ \t]+\+[ \t]+(\S+)[ \t]*$").expect("valid regex")
});

static BINARY_IMAGE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(0x[0-9a-f]+)[ \t]*-[ \t]*(?:0x[0-9a-f]+|\?{3})[ \t]+(.*?)[ \t]*<([0-9a-f-]{32,36})>[ \t]*(.*?)[ \t]*$",
    )
    .expect("valid regex")
});

/// Parse every process section of a report.
///
/// Sections whose `Process:` header carries no name are dropped.
pub fn parse(content: &str) -> Vec<ReportProcess>
{
    process_sections(content).filter_map(parse_process).collect()
}

/// Split a report into `Process:` sections.
///
/// Each section runs from its header line to just before the next header, or
/// to the end of the text.
pub fn process_sections(content: &str) -> impl Iterator<Item = &str>
{
    let starts: Vec<usize> = PROCESS_START.find_iter(content).map(|m| m.start()).collect();
    let ends: Vec<usize> = starts.iter().skip(1).copied().chain(std::iter::once(content.len())).collect();
    starts.into_iter().zip(ends).map(move |(start, end)| &content[start..end])
}

/// Parse one process section.
///
/// Returns `None` if the header has no name.
pub fn parse_process(section: &str) -> Option<ReportProcess>
{
    let name = PROCESS_NAME.captures(section)?.get(1)?.as_str().trim().to_string();
    if name.is_empty() {
        return None;
    }

    let parsed_images = parse_image_lines(section);
    let architecture = detect_architecture(section, &parsed_images);
    let binary_images: Vec<Arc<BinaryImage>> = parsed_images.into_iter().map(|parsed| Arc::new(parsed.image)).collect();

    let image_map = BinaryImageMap::new(&binary_images);
    let stack_frames = parse_frames(section, &image_map);

    if architecture.is_none() {
        tracing::debug!(process = %name, "no architecture header found");
    }
    tracing::debug!(
        process = %name,
        images = binary_images.len(),
        frames = stack_frames.len(),
        "parsed process section"
    );

    Some(ReportProcess::new(Some(name), architecture, binary_images, stack_frames))
}

/// Parse the binary image lines of a section.
pub fn parse_binary_images(section: &str) -> Vec<BinaryImage>
{
    parse_image_lines(section).into_iter().map(|parsed| parsed.image).collect()
}

/// Every frame line in `section` that can be bound to an image in `images`.
pub fn parse_frames(section: &str, images: &BinaryImageMap) -> Vec<StackFrame>
{
    FRAME_LINE
        .find_iter(section)
        .filter_map(|line| parse_frame(line.as_str(), images))
        .collect()
}

/// Parse a single frame line.
///
/// Returns `None` if the line does not have the frame shape, or if its target
/// matches neither a load address nor an image name in `images`.
pub fn parse_frame(line: &str, images: &BinaryImageMap) -> Option<StackFrame>
{
    let tokens = FrameTokens::find(line)?;
    let target = &line[tokens.target.clone()];
    let image = images.by_load_address(target).or_else(|| images.by_name(target))?;

    Some(StackFrame::new(
        line,
        &line[tokens.address.clone()],
        &line[tokens.offset.clone()],
        Arc::clone(image),
    ))
}

/// Byte ranges of the interesting tokens in a frame line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameTokens
{
    /// Image name column
    pub image: Range<usize>,
    /// Runtime address
    pub address: Range<usize>,
    /// Load address or symbolic target
    pub target: Range<usize>,
    /// Offset after `+`
    pub offset: Range<usize>,
}

impl FrameTokens
{
    /// Locate the tokens of `line`, which must be a single full frame line.
    pub fn find(line: &str) -> Option<Self>
    {
        let captures = FRAME_LINE.captures(line)?;
        let whole = captures.get(0)?;
        if whole.start() != 0 || whole.end() != line.trim_end_matches(['\n', '\r']).len() {
            return None;
        }
        Some(Self {
            image: captures.get(1)?.range(),
            address: captures.get(2)?.range(),
            target: captures.get(3)?.range(),
            offset: captures.get(4)?.range(),
        })
    }
}

/// Lookup of a section's images by load address and by name.
///
/// The first image wins when two share a key.
#[derive(Debug, Default)]
pub struct BinaryImageMap
{
    by_load_address: HashMap<u64, Arc<BinaryImage>>,
    by_name: HashMap<String, Arc<BinaryImage>>,
}

impl BinaryImageMap
{
    /// Index `images`.
    pub fn new(images: &[Arc<BinaryImage>]) -> Self
    {
        let mut map = Self::default();
        for image in images {
            if let Some(address) = image.load_address_value() {
                map.by_load_address.entry(address).or_insert_with(|| Arc::clone(image));
            }
            map.by_name.entry(image.name.clone()).or_insert_with(|| Arc::clone(image));
        }
        map
    }

    /// Image loaded at `address` (`0x`-prefixed hex).
    pub fn by_load_address(&self, address: &str) -> Option<&Arc<BinaryImage>>
    {
        if !address.trim_start().to_lowercase().starts_with("0x") {
            return None;
        }
        self.by_load_address.get(&parse_hex(address)?)
    }

    /// Image with file name `name`.
    pub fn by_name(&self, name: &str) -> Option<&Arc<BinaryImage>>
    {
        self.by_name.get(name)
    }
}

struct ParsedImage
{
    image: BinaryImage,
    architecture: Option<Architecture>,
}

fn parse_image_lines(section: &str) -> Vec<ParsedImage>
{
    BINARY_IMAGE_LINE
        .captures_iter(section)
        .filter_map(|captures| {
            let load_address = captures.get(1)?.as_str();
            let descriptor = captures.get(2).map_or("", |m| m.as_str()).trim();
            let uuid = BinaryUuid::parse(captures.get(3)?.as_str()).ok()?;
            let path = captures.get(4).map_or("", |m| m.as_str()).trim();

            let has_path = !path.is_empty() && path != "???";
            let name = if has_path {
                path.rsplit('/').next().unwrap_or(path).to_string()
            } else {
                descriptor.split_whitespace().next()?.trim_start_matches('+').to_string()
            };
            if name.is_empty() {
                return None;
            }

            let architecture = descriptor
                .split_whitespace()
                .last()
                .map(Architecture::from_tag)
                .filter(|arch| arch.is_known());

            Some(ParsedImage {
                image: BinaryImage {
                    name,
                    load_address: load_address.to_string(),
                    uuid,
                    path: has_path.then(|| path.to_string()),
                },
                architecture,
            })
        })
        .collect()
}

/// Architecture from the `Code Type:` header.
///
/// iOS reports print `ARM-64` for arm64e processes; the main image line
/// carries the real slice, so an arm64 header is refined from it.
fn detect_architecture(section: &str, images: &[ParsedImage]) -> Option<Architecture>
{
    let tag = ARCHITECTURE.captures(section)?.get(1)?.as_str();
    let architecture = Architecture::from_tag(tag);

    if architecture == Architecture::Arm64 {
        if let Some(Architecture::Arm64e) = images.first().and_then(|parsed| parsed.architecture) {
            return Some(Architecture::Arm64e);
        }
    }
    Some(architecture)
}

#[cfg(test)]
mod tests
{
    use super::*;

    const IOS_REPORT: &str = "\
Incident Identifier: 7A1C
Process:               MyApp [4242]
Path:                  /private/var/containers/Bundle/Application/X/MyApp.app/MyApp
Code Type:             ARM-64 (Native)

Thread 0 Crashed:
0   libswiftCore.dylib            0x00000001a3b5c9c4 _assertionFailure + 244
1   MyApp                         0x0000000104c8f1d0 MyApp + 12752
2   MyApp                         0x0000000104c8e0a4 0x104c8c000 + 8356
3   UIKitCore                     0x00000001a1d2e4f0 0x1a1b00000 + 2286832

Binary Images:
0x104c8c000 - 0x104c93fff MyApp arm64e  <6a8cb81345f63652ad33778fd1eab196> /private/var/containers/Bundle/Application/X/MyApp.app/MyApp
0x1a3a00000 - 0x1a3dfffff libswiftCore.dylib arm64e  <0f1e2d3c4b5a69788796a5b4c3d2e1f0> /usr/lib/swift/libswiftCore.dylib
";

    #[test]
    fn test_parse_ios_report()
    {
        let processes = parse(IOS_REPORT);
        assert_eq!(processes.len(), 1);

        let process = &processes[0];
        assert_eq!(process.name.as_deref(), Some("MyApp"));
        assert_eq!(process.architecture, Some(Architecture::Arm64e));
        assert_eq!(process.binary_images.len(), 2);
        assert_eq!(process.binary_images[0].name, "MyApp");
        assert_eq!(process.binary_images[0].load_address, "0x104c8c000");

        // Frame 0 targets a symbol name, frame 3 an image that is not listed.
        assert_eq!(process.stack_frames.len(), 2);
        assert_eq!(process.stack_frames[0].cryptic_address(), "0x0000000104c8f1d0");
        assert_eq!(process.stack_frames[0].binary_image().name, "MyApp");
        assert_eq!(process.stack_frames[1].byte_offset(), "8356");
    }

    #[test]
    fn test_parse_macos_binary_images()
    {
        let section = "\
Binary Images:
       0x100000000 -        0x100003fff +com.example.MyApp (1.0 - 1) <6A8CB813-45F6-3652-AD33-778FD1EAB196> /Applications/MyApp.app/Contents/MacOS/MyApp
    0x7fff2030a000 -     0x7fff2030bfff  libsystem_blocks.dylib (79) <B9D7B2D1-3DB0-38E0-9D5E-F1B1D2C3A4B5> /usr/lib/system/libsystem_blocks.dylib
               0x0 - 0xffffffffffffffff ??? (*) <00000000-0000-0000-0000-000000000000> ???
";
        let images = parse_binary_images(section);
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].name, "MyApp");
        assert_eq!(images[0].uuid.pretty(), "6A8CB813-45F6-3652-AD33-778FD1EAB196");
        assert_eq!(images[0].path.as_deref(), Some("/Applications/MyApp.app/Contents/MacOS/MyApp"));
        assert_eq!(images[1].name, "libsystem_blocks.dylib");
        assert_eq!(images[2].name, "???");
        assert_eq!(images[2].path, None);
    }

    #[test]
    fn test_sections_split_on_process_headers()
    {
        let content = "Process: A [1]\nCode Type: X86-64\n\nProcess: B [2]\nCode Type: ARM-64\nprocess: [3]\n";
        let sections: Vec<&str> = process_sections(content).collect();
        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("Process: A"));
        assert!(sections[1].ends_with("ARM-64\n"));

        // The unnamed third section is dropped.
        let processes = parse(content);
        assert_eq!(processes.len(), 2);
        assert_eq!(processes[0].architecture, Some(Architecture::X86_64));
        assert_eq!(processes[1].name.as_deref(), Some("B"));
    }

    #[test]
    fn test_missing_architecture_still_builds_process()
    {
        let processes = parse("Process: NoArch [7]\n");
        assert_eq!(processes.len(), 1);
        assert_eq!(processes[0].architecture, None);
    }

    #[test]
    fn test_frame_tokens_round_trip()
    {
        let images = vec![Arc::new(BinaryImage::new(
            "Some Framework",
            "0x10000",
            BinaryUuid::parse("6a8cb81345f63652ad33778fd1eab196").unwrap(),
        ))];
        let map = BinaryImageMap::new(&images);

        for (index, address, offset) in [(0, "0x0000000000010010", "16"), (12, "0x10ABC", "703164"), (3, "0x1", "0")] {
            let line = format!("{index:<4}Some Framework   \t{address} 0x10000 + {offset}");
            let frame = parse_frame(&line, &map).unwrap();
            assert_eq!(frame.cryptic_address(), address);
            assert_eq!(frame.byte_offset(), offset);
            assert_eq!(frame.original_line(), line);

            let tokens = FrameTokens::find(&line).unwrap();
            assert_eq!(&line[tokens.address], address);
            assert_eq!(&line[tokens.offset], offset);
            assert_eq!(&line[tokens.image], "Some Framework");
        }
    }

    #[test]
    fn test_non_frame_lines_are_rejected()
    {
        let map = BinaryImageMap::new(&[]);
        assert!(FrameTokens::find("Thread 0 Crashed:").is_none());
        assert!(FrameTokens::find("0   MyApp 0x1000 main").is_none());
        assert!(FrameTokens::find("x   MyApp 0x1000 0x1000 + 0").is_none());
        assert!(parse_frame("0   MyApp 0x1010 0x1000 + 16", &map).is_none());
    }
}
