use crate::debugger::address::GlobalAddress;
use object::{Object, ObjectSymbol, SymbolKind as ObjSymbolKind};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    NoType,
    Object,
    Function,
    Section,
    File,
    Other,
}

impl From<ObjSymbolKind> for SymbolKind {
    fn from(kind: ObjSymbolKind) -> Self {
        match kind {
            ObjSymbolKind::Unknown => SymbolKind::NoType,
            ObjSymbolKind::Data => SymbolKind::Object,
            ObjSymbolKind::Text => SymbolKind::Function,
            ObjSymbolKind::Section => SymbolKind::Section,
            ObjSymbolKind::File => SymbolKind::File,
            _ => SymbolKind::Other,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub addr: GlobalAddress,
}

/// The union of `.symtab` and `.dynsym`, demangled and indexed by name.
/// Lookup never fails: an unmatched name yields an empty list.
pub struct SymbolTab(HashMap<String, Vec<Symbol>>);

impl SymbolTab {
    pub fn build(object: &object::File) -> Self {
        let mut map: HashMap<String, Vec<Symbol>> = HashMap::new();
        let tables = [object.symbol_table(), object.dynamic_symbol_table()];
        for table in tables.into_iter().flatten() {
            for sym in table.symbols() {
                let Ok(raw_name) = sym.name() else { continue };
                if raw_name.is_empty() {
                    continue;
                }
                let name = rustc_demangle::demangle(raw_name).to_string();
                map.entry(name.clone()).or_default().push(Symbol {
                    name,
                    kind: sym.kind().into(),
                    addr: GlobalAddress::from(sym.address() as usize),
                });
            }
        }
        Self(map)
    }

    pub fn find(&self, name: &str) -> Vec<Symbol> {
        self.0.get(name).cloned().unwrap_or_default()
    }
}
