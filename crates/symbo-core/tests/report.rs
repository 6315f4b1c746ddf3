//! Tests for report loading and parsing

use std::fs;

use symbo_core::report::parser::{self, FrameTokens};
use symbo_core::report::{NoTranslator, ReportFile};
use symbo_core::types::{Architecture, BinaryUuid};
use symbo_core::SymboError;

const MACOS_REPORT: &str = "\
Process:               Mail [812]
Path:                  /Applications/Mail.app/Contents/MacOS/Mail
Code Type:             X86-64 (Native)

Thread 0 Crashed:: Dispatch queue: com.apple.main-thread
0   com.apple.mail                0x000000010f3a1c2e 0x10f2f0000 + 728110
1   com.apple.MailCore            0x0000000110112233 MCLog + 51
2   libdyld.dylib                 0x00007fff20345f3d start + 1

Binary Images:
       0x10f2f0000 -        0x10f5effff +com.apple.mail (16.0 - 3696) <11111111-2222-3333-4444-555555555555> /Applications/Mail.app/Contents/MacOS/Mail
       0x110100000 -        0x110200fff +com.apple.MailCore (16.0) <AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE> /System/Library/PrivateFrameworks/MailCore.framework/MailCore
";

#[test]
fn test_macos_report_processes()
{
    let report = ReportFile::new(MACOS_REPORT, None, &NoTranslator).unwrap();
    assert_eq!(report.processes.len(), 1);

    let process = &report.processes[0];
    assert_eq!(process.name.as_deref(), Some("Mail"));
    assert_eq!(process.architecture, Some(Architecture::X86_64));
    assert_eq!(process.binary_images.len(), 2);
    assert_eq!(process.binary_images[0].name, "Mail");
    assert_eq!(process.binary_images[1].name, "MailCore");

    // Frames are linked by load address; libdyld has no image entry.
    assert_eq!(process.stack_frames.len(), 1);
    assert_eq!(process.stack_frames[0].binary_image().name, "Mail");
    assert_eq!(process.stack_frames[0].byte_offset(), "728110");
}

#[test]
fn test_uuids_for_symbolication_cover_linked_images_only()
{
    let report = ReportFile::new(MACOS_REPORT, None, &NoTranslator).unwrap();
    let uuids = report.uuids_for_symbolication();
    assert_eq!(
        uuids.into_iter().collect::<Vec<_>>(),
        vec![BinaryUuid::parse("11111111-2222-3333-4444-555555555555").unwrap()]
    );
}

#[test]
fn test_multiple_processes_in_one_report()
{
    let content = format!("{MACOS_REPORT}\n{}", MACOS_REPORT.replace("Mail [812]", "Mail [813]"));
    let processes = parser::parse(&content);
    assert_eq!(processes.len(), 2);
    assert!(processes.iter().all(|process| process.stack_frames.len() == 1));
}

#[test]
fn test_crlf_reports_parse_like_lf_reports()
{
    let crlf = MACOS_REPORT.replace('\n', "\r\n");
    let report = ReportFile::new(crlf, None, &NoTranslator).unwrap();
    assert_eq!(report.content(), MACOS_REPORT);
    assert_eq!(report.processes[0].stack_frames.len(), 1);
}

#[test]
fn test_frame_tokens_point_into_the_line()
{
    let line = "1   com.apple.MailCore            0x0000000110112233 MCLog + 51";
    let tokens = FrameTokens::find(line).unwrap();
    assert_eq!(&line[tokens.image.clone()], "com.apple.MailCore");
    assert_eq!(&line[tokens.address.clone()], "0x0000000110112233");
    assert_eq!(&line[tokens.target.clone()], "MCLog");
    assert_eq!(&line[tokens.offset.clone()], "51");
}

#[test]
fn test_open_reads_from_disk()
{
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Mail.crash");
    fs::write(&path, MACOS_REPORT).unwrap();

    let report = ReportFile::open(&path, &NoTranslator).unwrap();
    assert_eq!(report.path.as_deref(), Some(path.as_path()));
    assert_eq!(report.directory(), Some(dir.path()));
    assert_eq!(report.save_location(), Some(dir.path().join("[S] Mail.txt")));
}

#[test]
fn test_input_errors()
{
    assert!(matches!(
        ReportFile::new(" \n\t", None, &NoTranslator),
        Err(SymboError::EmptyReport)
    ));
    assert!(matches!(
        ReportFile::new("{\"app_name\":\"Mail\"}\n{}", None, &NoTranslator),
        Err(SymboError::Translation(_))
    ));
    assert!(matches!(
        ReportFile::open("/nonexistent/symbo/Mail.crash", &NoTranslator),
        Err(SymboError::ReadReport { .. })
    ));
}
