//! Renaming the template's declarations after the generated struct.

use crate::error::GenError;
use crate::syntax::ast::{File, Ident, Scope};
use crate::syntax::visit::VisitMut;
use std::collections::BTreeMap;

/// Package-level helpers of the map that are suffixed with the struct name,
/// so several generated maps can share a package.
pub const COMPANIONS: [&str; 4] = ["entry", "readOnly", "expunged", "newEntry"];

/// Old name to new name for every renamed declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameMap {
    names: BTreeMap<String, String>,
}

impl RenameMap {
    /// `Map` becomes `name`; each companion gets `name`, first letter
    /// upper-cased, appended (`entry` to `entryIntMap`).
    pub fn for_struct(name: &str) -> Self {
        let suffix = upper_first(name);
        let mut names = BTreeMap::new();
        names.insert("Map".to_string(), name.to_string());
        for old in COMPANIONS {
            names.insert(old.to_string(), format!("{}{}", old, suffix));
        }
        Self { names }
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.names.get(old).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.names.iter().map(|(old, new)| (old.as_str(), new.as_str()))
    }
}

fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

struct Renamer<'a> {
    map: &'a RenameMap,
    count: usize,
}

impl VisitMut for Renamer<'_> {
    fn visit_ident(&mut self, ident: &mut Ident) {
        if let Some(new) = self.map.get(&ident.name) {
            if new != ident.name {
                ident.name = new.to_string();
                self.count += 1;
            }
        }
    }
}

/// Rename every scope-level occurrence of the mapped names, then rebuild the
/// file scope. Selectors, fields and method names are left alone. Returns
/// the number of identifiers changed.
pub fn rename(file: &mut File, map: &RenameMap) -> Result<usize, GenError> {
    let mut renamer = Renamer { map, count: 0 };
    renamer.visit_file(file);
    file.scope = Scope::collect(&file.decls).map_err(GenError::RenameCollision)?;
    Ok(renamer.count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::ast::ObjKind;
    use crate::syntax::{format_file, parse_file, LineTable};
    use crate::template::EMBEDDED;

    #[test]
    fn test_rename_map() {
        let map = RenameMap::for_struct("IntMap");
        assert_eq!(map.get("Map"), Some("IntMap"));
        assert_eq!(map.get("entry"), Some("entryIntMap"));
        assert_eq!(map.get("readOnly"), Some("readOnlyIntMap"));
        assert_eq!(map.get("expunged"), Some("expungedIntMap"));
        assert_eq!(map.get("newEntry"), Some("newEntryIntMap"));
        assert_eq!(map.get("Load"), None);
        assert_eq!(map.iter().count(), 5);
    }

    #[test]
    fn test_lowercase_struct_name() {
        let map = RenameMap::for_struct("cache");
        assert_eq!(map.get("Map"), Some("cache"));
        assert_eq!(map.get("entry"), Some("entryCache"));
    }

    #[test]
    fn test_rename_template() {
        let mut file = parse_file("map.go", EMBEDDED).unwrap();
        let count = rename(&mut file, &RenameMap::for_struct("IntMap")).unwrap();
        assert!(count > 0);

        for name in ["IntMap", "readOnlyIntMap", "expungedIntMap", "entryIntMap", "newEntryIntMap"] {
            assert!(file.scope.lookup(name).is_some(), "{}", name);
        }
        assert_eq!(file.scope.lookup("Map"), None);
        assert_eq!(file.scope.lookup("newEntryIntMap"), Some(ObjKind::Func));
        assert_eq!(file.scope.len(), 5);
    }

    #[test]
    fn test_members_are_not_renamed() {
        let source = "package p\n\ntype Map struct {\n\tentry int\n}\n\nfunc (m *Map) Map() int {\n\treturn m.entry\n}\n";
        let mut file = parse_file("p.go", source).unwrap();
        rename(&mut file, &RenameMap::for_struct("M2")).unwrap();

        let out = format_file(&file, &LineTable::new(source)).unwrap();
        assert_eq!(
            out,
            "package p\n\ntype M2 struct {\n\tentry int\n}\n\nfunc (m *M2) Map() int {\n\treturn m.entry\n}\n"
        );
    }

    #[test]
    fn test_collision() {
        let mut file = parse_file("p.go", "package p\n\ntype Map struct{}\n\ntype IntMap int\n").unwrap();
        let err = rename(&mut file, &RenameMap::for_struct("IntMap")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "rename collision: `IntMap` is declared more than once"
        );
    }
}
