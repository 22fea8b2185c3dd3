pub mod symbol;

use crate::debugger::address::GlobalAddress;
use crate::debugger::error::{Error, Result};
use gimli::{EndianRcSlice, RunTimeEndian};
use object::{Object, ObjectSection};
use std::path::{Path, PathBuf};
use std::rc::Rc;

type Reader = EndianRcSlice<RunTimeEndian>;

/// A resolved `(file, line)` location, with the address it was resolved
/// from or to. Produced by [`DebugInformation::line_from_pc`] and consumed
/// by the source-excerpt renderer.
#[derive(Debug, Clone)]
pub struct Place {
    pub file: PathBuf,
    pub line_number: u64,
    pub address: GlobalAddress,
}

#[derive(Debug, Clone)]
struct LineRow {
    address: GlobalAddress,
    file: PathBuf,
    line: u64,
    is_stmt: bool,
}

/// A `DW_TAG_subprogram` DIE, reduced to what the stepping algorithms need.
#[derive(Debug, Clone)]
pub struct FunctionDie {
    pub name: String,
    pub low_pc: GlobalAddress,
    pub high_pc: GlobalAddress,
}

struct CompUnit {
    low_pc: GlobalAddress,
    high_pc: GlobalAddress,
    functions: Vec<FunctionDie>,
    lines: Vec<LineRow>,
}

impl CompUnit {
    fn contains(&self, pc: GlobalAddress) -> bool {
        pc.in_range(self.low_pc, self.high_pc)
    }

    fn find_function(&self, pc: GlobalAddress) -> Option<&FunctionDie> {
        self.functions
            .iter()
            .find(|f| pc.in_range(f.low_pc, f.high_pc))
    }

    fn find_line(&self, pc: GlobalAddress) -> Option<&LineRow> {
        // last row whose address is <= pc (rows are sorted ascending).
        self.lines.iter().rev().find(|row| row.address <= pc)
    }
}

/// Eagerly-parsed DWARF/ELF view of a tracee binary. Built once at
/// [`DebugInformation::load`]; all queries afterward are pure reads.
pub struct DebugInformation {
    units: Vec<CompUnit>,
    symbols: symbol::SymbolTab,
    is_pie: bool,
}

impl DebugInformation {
    pub fn load(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { memmap2::Mmap::map(&file)? };
        let object = object::File::parse(&*mmap)?;
        let endian = if object.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };
        let is_pie = object.kind() == object::ObjectKind::Dynamic;

        let load_section = |id: gimli::SectionId| -> std::result::Result<Reader, gimli::Error> {
            let data = object
                .section_by_name(id.name())
                .and_then(|s| s.uncompressed_data().ok())
                .unwrap_or_default();
            Ok(EndianRcSlice::new(Rc::from(&*data), endian))
        };
        let dwarf = gimli::Dwarf::load(load_section)?;

        let symbols = symbol::SymbolTab::build(&object);

        let mut units = Vec::new();
        let mut header_iter = dwarf.units();
        while let Some(header) = header_iter.next()? {
            let unit = dwarf.unit(header)?;
            units.push(Self::parse_unit(&dwarf, &unit)?);
        }

        Ok(Self {
            units,
            symbols,
            is_pie,
        })
    }

    pub fn is_pie(&self) -> bool {
        self.is_pie
    }

    fn parse_unit(
        dwarf: &gimli::Dwarf<Reader>,
        unit: &gimli::Unit<Reader>,
    ) -> Result<CompUnit> {
        let mut functions = Vec::new();
        let mut low_pc = GlobalAddress::from(usize::MAX);
        let mut high_pc = GlobalAddress::from(0);

        let mut entries = unit.entries();
        while let Some((_, entry)) = entries.next_dfs()? {
            let (Some(entry_low), Some(entry_high)) = (read_low_pc(entry)?, read_high_pc(entry)?)
            else {
                continue;
            };
            if entry_low < low_pc {
                low_pc = entry_low;
            }
            if entry_high > high_pc {
                high_pc = entry_high;
            }
            if entry.tag() == gimli::DW_TAG_subprogram {
                if let Some(name) = read_name(dwarf, unit, entry)? {
                    functions.push(FunctionDie {
                        name,
                        low_pc: entry_low,
                        high_pc: entry_high,
                    });
                }
            }
        }

        let lines = match unit.line_program.clone() {
            Some(ilnp) => Self::parse_lines(dwarf, unit, ilnp)?,
            None => Vec::new(),
        };

        Ok(CompUnit {
            low_pc,
            high_pc,
            functions,
            lines,
        })
    }

    fn parse_lines(
        dwarf: &gimli::Dwarf<Reader>,
        unit: &gimli::Unit<Reader>,
        ilnp: gimli::IncompleteLineProgram<Reader>,
    ) -> Result<Vec<LineRow>> {
        let mut rows = Vec::new();
        let comp_dir = unit
            .comp_dir
            .as_ref()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state_rows = ilnp.rows();
        while let Some((lnp_header, row)) = state_rows.next_row()? {
            if row.end_sequence() {
                continue;
            }
            let Some(line) = row.line() else { continue };
            let file_path = lnp_header
                .file(row.file_index())
                .map(|file_entry| resolve_file_path(dwarf, unit, lnp_header, file_entry, &comp_dir))
                .transpose()?
                .unwrap_or_default();

            rows.push(LineRow {
                address: GlobalAddress::from(row.address() as usize),
                file: PathBuf::from(file_path),
                line: line.get(),
                is_stmt: row.is_stmt(),
            });
        }
        rows.sort_by_key(|r| r.address);
        Ok(rows)
    }

    fn unit_for(&self, pc: GlobalAddress) -> Option<&CompUnit> {
        self.units.iter().find(|u| u.contains(pc))
    }

    /// Find the enclosing function DIE for an address.
    pub fn function_from_pc(&self, pc: GlobalAddress) -> Result<FunctionDie> {
        self.unit_for(pc)
            .and_then(|u| u.find_function(pc))
            .cloned()
            .ok_or(Error::FunctionNotFound(pc))
    }

    /// Find the `(file, line)` covering an address.
    pub fn line_from_pc(&self, pc: GlobalAddress) -> Result<Place> {
        let unit = self.unit_for(pc).ok_or(Error::PlaceNotFound(pc))?;
        let row = unit.find_line(pc).ok_or(Error::PlaceNotFound(pc))?;
        Ok(Place {
            file: row.file.clone(),
            line_number: row.line,
            address: row.address,
        })
    }

    /// Find the first address assigned to a `(file, line)` pair. `file` is
    /// matched by suffix so a bare file name matches a full path.
    pub fn source_line(&self, file: &str, line: u64) -> Result<GlobalAddress> {
        for unit in &self.units {
            let found = unit
                .lines
                .iter()
                .find(|row| row.is_stmt && row.line == line && path_matches(&row.file, file));
            if let Some(row) = found {
                return Ok(row.address);
            }
        }
        Err(Error::SourceLineNotFound(file.to_string(), line))
    }

    /// Resolve a function's entry address, skipping the prologue: the line
    /// table entry at `low_pc`, advanced by one entry.
    pub fn function_by_name(&self, name: &str) -> Result<GlobalAddress> {
        for unit in &self.units {
            let Some(func) = unit.functions.iter().find(|f| f.name == name) else {
                continue;
            };
            let idx = unit.lines.iter().position(|row| row.address == func.low_pc);
            return match idx {
                Some(i) if i + 1 < unit.lines.len() => Ok(unit.lines[i + 1].address),
                Some(_) => Ok(func.low_pc),
                None => Ok(func.low_pc),
            };
        }
        Err(Error::FunctionNameNotFound(name.to_string()))
    }

    pub fn func_entry(&self, f: &FunctionDie) -> GlobalAddress {
        f.low_pc
    }

    pub fn func_end(&self, f: &FunctionDie) -> GlobalAddress {
        f.high_pc
    }

    /// Ordered line-table rows covering `[low, high)`, used by step-over to
    /// enumerate every distinct-line address in the current function.
    pub fn lines_in_range(&self, low: GlobalAddress, high: GlobalAddress) -> Vec<GlobalAddress> {
        let Some(unit) = self.unit_for(low) else {
            return Vec::new();
        };
        unit.lines
            .iter()
            .filter(|row| row.address >= low && row.address < high)
            .map(|row| row.address)
            .collect()
    }

    pub fn lookup_symbol(&self, name: &str) -> Vec<symbol::Symbol> {
        self.symbols.find(name)
    }
}

fn read_name(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    entry: &gimli::DebuggingInformationEntry<Reader>,
) -> Result<Option<String>> {
    let Some(attr) = entry.attr_value(gimli::DW_AT_name)? else {
        return Ok(None);
    };
    let name = dwarf.attr_string(unit, attr)?;
    Ok(Some(name.to_string_lossy()?.into_owned()))
}

fn read_low_pc(entry: &gimli::DebuggingInformationEntry<Reader>) -> Result<Option<GlobalAddress>> {
    let Some(attr) = entry.attr_value(gimli::DW_AT_low_pc)? else {
        return Ok(None);
    };
    match attr {
        gimli::AttributeValue::Addr(a) => Ok(Some(GlobalAddress::from(a as usize))),
        _ => Ok(None),
    }
}

fn read_high_pc(entry: &gimli::DebuggingInformationEntry<Reader>) -> Result<Option<GlobalAddress>> {
    let Some(low) = read_low_pc(entry)? else {
        return Ok(None);
    };
    let Some(attr) = entry.attr_value(gimli::DW_AT_high_pc)? else {
        return Ok(None);
    };
    match attr {
        gimli::AttributeValue::Addr(a) => Ok(Some(GlobalAddress::from(a as usize))),
        gimli::AttributeValue::Udata(offset) => {
            Ok(Some(GlobalAddress::from(low.as_usize() + offset as usize)))
        }
        _ => Ok(None),
    }
}

fn resolve_file_path(
    dwarf: &gimli::Dwarf<Reader>,
    unit: &gimli::Unit<Reader>,
    header: &gimli::LineProgramHeader<Reader>,
    file_entry: &gimli::FileEntry<Reader>,
    comp_dir: &str,
) -> Result<String> {
    let name = dwarf
        .attr_string(unit, file_entry.path_name())?
        .to_string_lossy()?
        .into_owned();

    let dir = header
        .directory(file_entry.directory_index())
        .map(|d| dwarf.attr_string(unit, d))
        .transpose()?
        .map(|d| d.to_string_lossy().map(|s| s.into_owned()))
        .transpose()?;

    let joined = match dir {
        Some(dir) if !dir.is_empty() => format!("{dir}/{name}"),
        _ => name,
    };
    if Path::new(&joined).is_relative() && !comp_dir.is_empty() {
        Ok(format!("{comp_dir}/{joined}"))
    } else {
        Ok(joined)
    }
}

/// Matches `needle` against `path` by trailing path components, so
/// `"hello.rs"` and `"src/hello.rs"` both match `/abs/src/hello.rs` but
/// `"other/hello.rs"` does not.
fn path_matches(path: &Path, needle: &str) -> bool {
    let needle_components: Vec<_> = Path::new(needle).components().collect();
    if needle_components.is_empty() {
        return false;
    }
    let path_components: Vec<_> = path.components().collect();
    if needle_components.len() > path_components.len() {
        return false;
    }
    let tail = &path_components[path_components.len() - needle_components.len()..];
    tail == needle_components.as_slice()
}

/// Parse `/proc/<pid>/maps`'s first line, first hex field, as the load base
/// of the primary image.
pub fn read_load_offset(pid: nix::unistd::Pid) -> Result<usize> {
    let maps = std::fs::read_to_string(format!("/proc/{pid}/maps"))?;
    let first_line = maps
        .lines()
        .next()
        .ok_or_else(|| Error::InvalidArgument("empty /proc/<pid>/maps".to_string()))?;
    let hex = first_line
        .split('-')
        .next()
        .ok_or_else(|| Error::InvalidArgument("malformed /proc/<pid>/maps line".to_string()))?;
    usize::from_str_radix(hex, 16)
        .map_err(|_| Error::InvalidArgument(format!("bad load address: {hex}")))
}
