//! Mach-O slice enumeration shared by the native UUID reader and resolver.

use object::macho::{self, MachHeader32, MachHeader64};
use object::read::macho::{FatArch, MachHeader, MachOFatFile32, MachOFatFile64};
use object::{Endianness, FileKind, Object};

use crate::types::{Architecture, BinaryUuid};

/// One architecture slice of a thin or universal Mach-O file.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MachSlice<'data>
{
    pub data: &'data [u8],
    pub architecture: Architecture,
    pub uuid: Option<BinaryUuid>,
}

/// Every slice of `data`.
///
/// Returns an empty list for files that are not Mach-O at all.
pub(crate) fn slices(data: &[u8]) -> object::Result<Vec<MachSlice<'_>>>
{
    let slice_data: Vec<&[u8]> = match FileKind::parse(data)? {
        FileKind::MachOFat32 => {
            let fat = MachOFatFile32::parse(data)?;
            fat.arches().iter().map(|arch| arch.data(data)).collect::<object::Result<_>>()?
        }
        FileKind::MachOFat64 => {
            let fat = MachOFatFile64::parse(data)?;
            fat.arches().iter().map(|arch| arch.data(data)).collect::<object::Result<_>>()?
        }
        FileKind::MachO32 | FileKind::MachO64 => vec![data],
        _ => Vec::new(),
    };

    let mut slices = Vec::with_capacity(slice_data.len());
    for data in slice_data {
        if let Some(slice) = thin_slice(data)? {
            slices.push(slice);
        }
    }
    Ok(slices)
}

fn thin_slice(data: &[u8]) -> object::Result<Option<MachSlice<'_>>>
{
    let (cputype, cpusubtype) = match FileKind::parse(data)? {
        FileKind::MachO32 => header_cpu::<MachHeader32<Endianness>>(data)?,
        FileKind::MachO64 => header_cpu::<MachHeader64<Endianness>>(data)?,
        _ => return Ok(None),
    };

    let file = object::File::parse(data)?;
    let architecture = refine(Architecture::from_object(file.architecture()), cputype, cpusubtype);
    let uuid = file.mach_uuid()?.map(BinaryUuid::from);

    Ok(Some(MachSlice {
        data,
        architecture,
        uuid,
    }))
}

fn header_cpu<Mach: MachHeader>(data: &[u8]) -> object::Result<(u32, u32)>
{
    let header = Mach::parse(data, 0)?;
    let endian = header.endian()?;
    Ok((header.cputype(endian), header.cpusubtype(endian)))
}

/// Apply the CPU subtypes `object` folds into their base architecture.
fn refine(architecture: Architecture, cputype: u32, cpusubtype: u32) -> Architecture
{
    let subtype = cpusubtype & !macho::CPU_SUBTYPE_MASK;
    match (cputype, subtype) {
        (macho::CPU_TYPE_ARM64, macho::CPU_SUBTYPE_ARM64E) => Architecture::Arm64e,
        (macho::CPU_TYPE_X86_64, macho::CPU_SUBTYPE_X86_64_H) => Architecture::X86_64h,
        (macho::CPU_TYPE_ARM, macho::CPU_SUBTYPE_ARM_V7S) => Architecture::Armv7s,
        _ => architecture,
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_refine_subtypes()
    {
        assert_eq!(
            refine(Architecture::Arm64, macho::CPU_TYPE_ARM64, macho::CPU_SUBTYPE_ARM64E | 0x8000_0000),
            Architecture::Arm64e
        );
        assert_eq!(
            refine(Architecture::X86_64, macho::CPU_TYPE_X86_64, macho::CPU_SUBTYPE_X86_64_H),
            Architecture::X86_64h
        );
        assert_eq!(
            refine(Architecture::Arm64, macho::CPU_TYPE_ARM64, macho::CPU_SUBTYPE_ARM64_ALL),
            Architecture::Arm64
        );
    }

    #[test]
    fn test_non_macho_has_no_slices()
    {
        assert!(slices(b"#!/bin/sh\necho not a binary\n").map(|s| s.is_empty()).unwrap_or(true));
    }
}
