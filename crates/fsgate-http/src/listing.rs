use chrono::{DateTime, Utc};
use fsgate_common::time::listing_date;
use fsgate_common::types::{FileInfo, Identity};

use crate::path::revert_invalid_char;
use crate::permissions::{can_execute, can_read};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Dir,
}

/// One row of a directory listing, alive only for the response that
/// built it.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub name: String,
    pub kind: EntryKind,
    pub size_display: String,
    /// Fixed-width zero-padded decimal so lexicographic order behaves
    /// numerically. Empty for directories.
    pub size_sort_key: String,
    pub modified_display: String,
    pub modified: DateTime<Utc>,
}

/// Distinguished file names the listing treats specially.
#[derive(Debug, Clone, Default)]
pub struct Markers {
    /// Excluded from the listing, flagged present.
    pub header: Option<String>,
    /// Kept in the listing, flagged present.
    pub readme: Option<String>,
}

/// Column-width bookkeeping for the presentation layer. Purely
/// cosmetic; the floors keep short listings from collapsing.
#[derive(Debug, Clone)]
pub struct ListingLayout {
    pub name_max: usize,
    pub size_max: usize,
    pub header_present: bool,
    pub readme_present: bool,
}

impl Default for ListingLayout {
    fn default() -> Self {
        Self {
            name_max: 25,
            size_max: 1,
            header_present: false,
            readme_present: false,
        }
    }
}

impl ListingLayout {
    /// Multi-byte names render wider than their char count but narrower
    /// than their byte count; split the difference.
    fn observe_name(&mut self, name: &str) {
        let chars = name.chars().count();
        let bytes = name.len();
        let width = if bytes > chars {
            bytes - (bytes - chars) / 2
        } else {
            chars
        };
        self.name_max = self.name_max.max(width);
    }

    fn observe_size(&mut self, display: &str) {
        self.size_max = self.size_max.max(display.len());
    }
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub dirs: Vec<DirectoryEntry>,
    pub files: Vec<DirectoryEntry>,
    pub layout: ListingLayout,
}

/// Build the permission-filtered view of a directory's children. The
/// caller has already verified execute permission on the directory
/// itself. Child directories the identity cannot execute, and child
/// files it cannot read, are silently dropped.
pub fn collect(entries: &[FileInfo], identity: &Identity, markers: &Markers) -> Listing {
    let mut listing = Listing::default();

    for info in entries {
        let name = revert_invalid_char(last_segment(&info.path));

        if markers.header.as_deref() == Some(name.as_str()) {
            listing.layout.header_present = true;
            continue;
        }
        if markers.readme.as_deref() == Some(name.as_str()) {
            listing.layout.readme_present = true;
        }

        if info.is_dir {
            if !can_execute(info, identity) {
                continue;
            }
        } else if !can_read(info, identity) {
            continue;
        }

        listing.layout.observe_name(&name);
        let modified_display = listing_date(&info.modified);

        if info.is_dir {
            listing.dirs.push(DirectoryEntry {
                name,
                kind: EntryKind::Dir,
                size_display: String::new(),
                size_sort_key: String::new(),
                modified_display,
                modified: info.modified,
            });
        } else {
            let size_display = byte_desc(info.size);
            listing.layout.observe_size(&size_display);
            listing.files.push(DirectoryEntry {
                name,
                kind: EntryKind::File,
                size_display,
                size_sort_key: size_sort_key(info.size),
                modified_display,
                modified: info.modified,
            });
        }
    }

    listing
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Modified,
    Size,
}

impl SortColumn {
    pub fn from_param(value: &str) -> Option<Self> {
        match value {
            "N" => Some(Self::Name),
            "M" => Some(Self::Modified),
            "S" => Some(Self::Size),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_param(value: &str) -> Self {
        if value == "D" { Self::Desc } else { Self::Asc }
    }

    pub fn flipped_param(&self) -> &'static str {
        match self {
            Self::Asc => "D",
            Self::Desc => "A",
        }
    }
}

/// Order entries by the chosen column. The comparator works on
/// `(primary key, original index)` pairs, so entries with equal keys
/// keep a deterministic relative order in either direction.
pub fn sort_entries(entries: &mut Vec<DirectoryEntry>, column: SortColumn, direction: SortDirection) {
    let mut decorated: Vec<(usize, DirectoryEntry)> =
        std::mem::take(entries).into_iter().enumerate().collect();

    decorated.sort_by(|(left_idx, left), (right_idx, right)| {
        let primary = match column {
            SortColumn::Name => left.name.cmp(&right.name),
            SortColumn::Modified => left.modified.cmp(&right.modified),
            SortColumn::Size => left.size_sort_key.cmp(&right.size_sort_key),
        };
        let primary = match direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then(left_idx.cmp(right_idx))
    });

    *entries = decorated.into_iter().map(|(_, entry)| entry).collect();
}

/// Abbreviated English size: 1024-multiples, one decimal digit with a
/// trailing `.0` dropped.
pub fn byte_desc(len: i64) -> String {
    const KIB: i64 = 1024;
    let (value, suffix) = if len < KIB {
        return len.to_string();
    } else if len < KIB.pow(2) {
        (len as f64 / KIB as f64, "K")
    } else if len < KIB.pow(3) {
        (len as f64 / KIB.pow(2) as f64, "M")
    } else if len < KIB.pow(4) {
        (len as f64 / KIB.pow(3) as f64, "G")
    } else if len < KIB.pow(5) {
        (len as f64 / KIB.pow(4) as f64, "T")
    } else {
        (len as f64 / KIB.pow(5) as f64, "P")
    };
    let mut formatted = format!("{value:.1}");
    if let Some(trimmed) = formatted.strip_suffix(".0") {
        formatted = trimmed.to_string();
    }
    format!("{formatted}{suffix}")
}

fn size_sort_key(len: i64) -> String {
    format!("{len:012}")
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use fsgate_common::types::{PermissionBits, PermissionTriple};

    use super::*;

    fn identity() -> Identity {
        Identity::new("alice", ["staff".to_string()])
    }

    fn child(name: &str, is_dir: bool, size: i64, other: PermissionBits) -> FileInfo {
        FileInfo {
            path: format!("/dir/{name}"),
            is_dir,
            size,
            modified: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            owner: "root".to_string(),
            group: "wheel".to_string(),
            permissions: PermissionTriple::new(PermissionBits::None, PermissionBits::None, other),
        }
    }

    #[test]
    fn unauthorized_entries_are_silently_dropped() {
        let entries = vec![
            child("open.txt", false, 10, PermissionBits::Read),
            child("secret.txt", false, 10, PermissionBits::None),
            child("pub", true, 0, PermissionBits::ReadExecute),
            // Read without execute does not let a directory be listed.
            child("locked", true, 0, PermissionBits::Read),
        ];
        let listing = collect(&entries, &identity(), &Markers::default());
        let files: Vec<&str> = listing.files.iter().map(|e| e.name.as_str()).collect();
        let dirs: Vec<&str> = listing.dirs.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(files, vec!["open.txt"]);
        assert_eq!(dirs, vec!["pub"]);
    }

    #[test]
    fn header_marker_is_flagged_and_excluded() {
        let entries = vec![
            child("HEADER.html", false, 10, PermissionBits::Read),
            child("data.txt", false, 10, PermissionBits::Read),
        ];
        let markers = Markers {
            header: Some("HEADER.html".to_string()),
            readme: None,
        };
        let listing = collect(&entries, &identity(), &markers);
        assert!(listing.layout.header_present);
        assert_eq!(listing.files.len(), 1);
        assert_eq!(listing.files[0].name, "data.txt");
    }

    #[test]
    fn readme_marker_is_flagged_but_kept() {
        let entries = vec![child("README.txt", false, 10, PermissionBits::Read)];
        let markers = Markers {
            header: None,
            readme: Some("README.txt".to_string()),
        };
        let listing = collect(&entries, &identity(), &markers);
        assert!(listing.layout.readme_present);
        assert_eq!(listing.files.len(), 1);
    }

    #[test]
    fn escaped_colon_is_reverted_for_display() {
        let entries = vec![child("a%3ab.txt", false, 10, PermissionBits::Read)];
        let listing = collect(&entries, &identity(), &Markers::default());
        assert_eq!(listing.files[0].name, "a:b.txt");
    }

    #[test]
    fn directories_carry_empty_size_columns() {
        let entries = vec![child("sub", true, 0, PermissionBits::ReadExecute)];
        let listing = collect(&entries, &identity(), &Markers::default());
        assert_eq!(listing.dirs[0].size_display, "");
        assert_eq!(listing.dirs[0].size_sort_key, "");
    }

    #[test]
    fn byte_desc_scales_in_1024_steps() {
        assert_eq!(byte_desc(0), "0");
        assert_eq!(byte_desc(512), "512");
        assert_eq!(byte_desc(1024), "1K");
        assert_eq!(byte_desc(1536), "1.5K");
        assert_eq!(byte_desc(1024 * 1024), "1M");
        assert_eq!(byte_desc(5 * 1024 * 1024 * 1024), "5G");
        assert_eq!(byte_desc(1024_i64.pow(4)), "1T");
        assert_eq!(byte_desc(1024_i64.pow(5) * 2), "2P");
    }

    #[test]
    fn size_sort_key_is_fixed_width() {
        assert_eq!(size_sort_key(42), "000000000042");
        assert!(size_sort_key(999) < size_sort_key(1000));
    }

    fn entry(name: &str, size: i64, minute: u32) -> DirectoryEntry {
        DirectoryEntry {
            name: name.to_string(),
            kind: EntryKind::File,
            size_display: byte_desc(size),
            size_sort_key: size_sort_key(size),
            modified_display: String::new(),
            modified: Utc.with_ymd_and_hms(2024, 3, 1, 12, minute, 0).unwrap(),
        }
    }

    #[test]
    fn sort_by_each_column() {
        let mut entries = vec![entry("b", 300, 2), entry("c", 100, 1), entry("a", 200, 3)];

        sort_entries(&mut entries, SortColumn::Name, SortDirection::Asc);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        sort_entries(&mut entries, SortColumn::Size, SortDirection::Desc);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a", "c"]);

        sort_entries(&mut entries, SortColumn::Modified, SortDirection::Asc);
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["c", "b", "a"]);
    }

    #[test]
    fn ties_keep_deterministic_order_across_runs() {
        let make = || {
            vec![
                entry("dup", 100, 1),
                entry("dup2", 100, 1),
                entry("dup3", 100, 1),
            ]
        };
        let mut first = make();
        sort_entries(&mut first, SortColumn::Size, SortDirection::Desc);
        for _ in 0..5 {
            let mut again = make();
            sort_entries(&mut again, SortColumn::Size, SortDirection::Desc);
            let left: Vec<&str> = first.iter().map(|e| e.name.as_str()).collect();
            let right: Vec<&str> = again.iter().map(|e| e.name.as_str()).collect();
            assert_eq!(left, right);
        }
    }
}
