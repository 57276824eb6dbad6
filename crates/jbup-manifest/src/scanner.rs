//! Installed plugin discovery
//!
//! A plugins directory holds one subdirectory per plugin. Each plugin carries
//! its descriptor either unpacked at `META-INF/plugin.xml` or inside one of the
//! jars under `lib/`. Anything that cannot be read is left out of the registry
//! so that a rescan is always safe to repeat.

use crate::build_id::CompatibilityRange;
use crate::errors::{ManifestError, ScanError};
use crate::types::{PluginManifest, PluginRecord, Registry};
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Descriptor location, both on disk and inside jars
pub const MANIFEST_PATH: &str = "META-INF/plugin.xml";

/// Subdirectory holding a plugin's jars
pub const LIB_DIR: &str = "lib";

/// Infix of the sibling directory an install moves the previous version to
const BACKUP_INFIX: &str = ".bak.";

/// Scan `plugins_dir` and return every readable plugin keyed by id.
///
/// Directories are visited in sorted name order. When two directories declare
/// the same id the later one wins and a warning is emitted.
pub fn scan(plugins_dir: &Path) -> Result<Registry, ScanError> {
    if !plugins_dir.is_dir() {
        return Err(ScanError::NotADirectory(plugins_dir.to_path_buf()));
    }

    let entries = fs::read_dir(plugins_dir).map_err(|source| ScanError::Read {
        path: plugins_dir.to_path_buf(),
        source,
    })?;

    let mut dirs: Vec<(String, PathBuf)> = entries
        .flatten()
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().to_string();
            let path = entry.path();
            (!name.starts_with('.') && path.is_dir()).then_some((name, path))
        })
        .collect();
    dirs.sort_by(|a, b| a.0.cmp(&b.0));

    let mut registry = Registry::new();
    for (name, path) in dirs {
        if is_backup_folder(&name) {
            debug!("Skipping install backup: {}", path.display());
            continue;
        }

        let Some(record) = scan_plugin_dir(&path) else {
            continue;
        };

        if let Some(previous) = registry.get(&record.id) {
            warn!(
                "Duplicate plugin id '{}': {} overrides {}",
                record.id,
                record.install_path.display(),
                previous.install_path.display()
            );
        }
        registry.insert(record.id.clone(), record);
    }

    debug!(
        "Scanned {} plugin(s) in {}",
        registry.len(),
        plugins_dir.display()
    );
    Ok(registry)
}

/// Read a single plugin directory into a record, or `None` when it has no usable descriptor.
pub fn scan_plugin_dir(dir: &Path) -> Option<PluginRecord> {
    match read_plugin_dir(dir) {
        Ok(manifest) => Some(PluginRecord::from_manifest(manifest, dir.to_path_buf())),
        Err(e) => {
            debug!("Skipping {}: {}", dir.display(), e);
            None
        }
    }
}

/// Locate and parse the descriptor of one plugin directory.
///
/// The unpacked `META-INF/plugin.xml` is tried first, then each `lib/*.jar`
/// in sorted order until one yields a descriptor with an id.
pub fn read_plugin_dir(dir: &Path) -> Result<PluginManifest, ManifestError> {
    let unpacked = dir.join(MANIFEST_PATH);
    if unpacked.is_file() {
        let parsed = fs::read_to_string(&unpacked)
            .map_err(ManifestError::from)
            .and_then(|xml| parse_plugin_xml(&xml));
        match parsed {
            Ok(manifest) => return Ok(manifest),
            Err(e) => debug!("Unreadable {}: {}", unpacked.display(), e),
        }
    }

    for jar in sorted_jars(&dir.join(LIB_DIR)) {
        match read_manifest_from_jar(&jar) {
            Ok(manifest) => return Ok(manifest),
            Err(e) => debug!("No descriptor in {}: {}", jar.display(), e),
        }
    }

    Err(ManifestError::NotFound(dir.to_path_buf()))
}

fn sorted_jars(lib_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(lib_dir) else {
        return Vec::new();
    };

    let mut jars: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == "jar")
        })
        .collect();
    jars.sort();
    jars
}

/// Read the descriptor stored inside a jar.
pub fn read_manifest_from_jar(jar: &Path) -> Result<PluginManifest, ManifestError> {
    let file = File::open(jar)?;
    let mut archive = zip::ZipArchive::new(BufReader::new(file))?;
    let mut entry = archive.by_name(MANIFEST_PATH)?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    if xml.trim().is_empty() {
        return Err(ManifestError::NotFound(jar.to_path_buf()));
    }
    parse_plugin_xml(&xml)
}

/// Parse `plugin.xml` text.
///
/// `<name>` stands in for a missing `<id>` (legacy descriptors). The
/// `<idea-version>` bounds accept both the hyphenated and camel-case attribute
/// names, preferring the hyphenated one.
pub fn parse_plugin_xml(xml: &str) -> Result<PluginManifest, ManifestError> {
    let doc = roxmltree::Document::parse(xml)?;

    let element_text = |tag: &str| {
        doc.descendants()
            .find(|node| node.has_tag_name(tag))
            .and_then(|node| node.text())
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(str::to_string)
    };

    let id = element_text("id")
        .or_else(|| element_text("name"))
        .ok_or(ManifestError::MissingId)?;
    let version = element_text("version");

    let idea_version = doc
        .descendants()
        .find(|node| node.has_tag_name("idea-version"));
    let bound = |hyphenated: &str, camel: &str| {
        idea_version
            .and_then(|node| node.attribute(hyphenated).or_else(|| node.attribute(camel)))
            .map(str::to_string)
    };

    Ok(PluginManifest {
        id,
        version,
        compatibility: CompatibilityRange::new(
            bound("since-build", "sinceBuild"),
            bound("until-build", "untilBuild"),
        ),
    })
}

/// Name of the sibling directory an existing install is moved to.
///
/// `attempt` disambiguates installs that happen within the same second.
pub fn backup_folder_name(folder: &str, unix_seconds: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{}{}{}", folder, BACKUP_INFIX, unix_seconds)
    } else {
        format!("{}{}{}-{}", folder, BACKUP_INFIX, unix_seconds, attempt)
    }
}

/// Whether a directory name was produced by [`backup_folder_name`].
pub fn is_backup_folder(name: &str) -> bool {
    let Some(idx) = name.rfind(BACKUP_INFIX) else {
        return false;
    };
    let suffix = &name[idx + BACKUP_INFIX.len()..];
    let (stamp, attempt) = suffix.split_once('-').unwrap_or((suffix, "0"));

    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    idx > 0 && all_digits(stamp) && all_digits(attempt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const FOO_XML: &str = r#"<idea-plugin>
  <id>com.example.foo</id>
  <name>Foo</name>
  <version>1.2.3</version>
  <idea-version since-build="240.0" until-build="260.*"/>
</idea-plugin>"#;

    fn write_unpacked(root: &Path, folder: &str, xml: &str) -> PathBuf {
        let dir = root.join(folder);
        let meta = dir.join("META-INF");
        if let Err(e) = fs::create_dir_all(&meta) {
            panic!("create {}: {e}", meta.display());
        }
        if let Err(e) = fs::write(meta.join("plugin.xml"), xml) {
            panic!("write plugin.xml: {e}");
        }
        dir
    }

    fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let Ok(file) = File::create(path) else {
            panic!("create jar {}", path.display());
        };
        let mut writer = zip::ZipWriter::new(file);
        for (name, content) in entries {
            let options = zip::write::SimpleFileOptions::default();
            if writer.start_file(*name, options).is_err()
                || writer.write_all(content.as_bytes()).is_err()
            {
                panic!("write jar entry {name}");
            }
        }
        if writer.finish().is_err() {
            panic!("finish jar");
        }
    }

    fn temp_root() -> TempDir {
        match TempDir::new() {
            Ok(dir) => dir,
            Err(e) => panic!("temp dir: {e}"),
        }
    }

    #[test]
    fn test_parse_plugin_xml_reads_all_fields() {
        let manifest = parse_plugin_xml(FOO_XML);
        assert!(manifest.is_ok_and(|m| m.id == "com.example.foo"
            && m.version.as_deref() == Some("1.2.3")
            && m.compatibility.since.as_deref() == Some("240.0")
            && m.compatibility.until.as_deref() == Some("260.*")));
    }

    #[test]
    fn test_parse_plugin_xml_camel_case_bounds() {
        let xml = r#"<idea-plugin><id>a</id><idea-version sinceBuild="193.1" untilBuild="203.*"/></idea-plugin>"#;
        let manifest = parse_plugin_xml(xml);
        assert!(manifest.is_ok_and(|m| m.compatibility.since.as_deref() == Some("193.1")
            && m.compatibility.until.as_deref() == Some("203.*")));
    }

    #[test]
    fn test_parse_plugin_xml_prefers_hyphenated_bounds() {
        let xml = r#"<idea-plugin><id>a</id><idea-version since-build="1" sinceBuild="2"/></idea-plugin>"#;
        let manifest = parse_plugin_xml(xml);
        assert!(manifest.is_ok_and(|m| m.compatibility.since.as_deref() == Some("1")));
    }

    #[test]
    fn test_parse_plugin_xml_legacy_name_fallback() {
        let xml = "<idea-plugin><name>Legacy Plugin</name><version>0.9</version></idea-plugin>";
        let manifest = parse_plugin_xml(xml);
        assert!(manifest.is_ok_and(|m| m.id == "Legacy Plugin"
            && m.compatibility == CompatibilityRange::default()));
    }

    #[test]
    fn test_parse_plugin_xml_errors() {
        assert!(matches!(
            parse_plugin_xml("<idea-plugin><id>"),
            Err(ManifestError::Xml(_))
        ));
        assert!(matches!(
            parse_plugin_xml("<idea-plugin><version>1</version></idea-plugin>"),
            Err(ManifestError::MissingId)
        ));
    }

    #[test]
    fn test_scan_skips_malformed_sibling() {
        let root = temp_root();
        let foo = write_unpacked(root.path(), "foo", FOO_XML);
        write_unpacked(root.path(), "broken", "<idea-plugin><id>oops");

        let registry = scan(root.path());
        let Ok(registry) = registry else {
            panic!("scan should succeed");
        };

        assert_eq!(registry.len(), 1);
        let record = &registry["com.example.foo"];
        assert_eq!(record.installed_version.as_deref(), Some("1.2.3"));
        assert_eq!(record.install_path, foo);
        assert_eq!(record.folder, "foo");
        assert_eq!(record.compatibility.since.as_deref(), Some("240.0"));
        assert_eq!(record.compatibility.until.as_deref(), Some("260.*"));
    }

    #[test]
    fn test_scan_ignores_hidden_files_and_backups() {
        let root = temp_root();
        write_unpacked(root.path(), ".hidden", FOO_XML);
        write_unpacked(root.path(), "foo.bak.1700000000", FOO_XML);
        if fs::write(root.path().join("stray.txt"), "x").is_err() {
            panic!("write stray file");
        }

        let registry = scan(root.path());
        assert!(registry.is_ok_and(|r| r.is_empty()));
    }

    #[test]
    fn test_scan_reads_jars_in_sorted_order() {
        let root = temp_root();
        let lib = root.path().join("jarred").join(LIB_DIR);
        if fs::create_dir_all(&lib).is_err() {
            panic!("create lib dir");
        }
        write_jar(&lib.join("a-deps.jar"), &[("other.txt", "no descriptor")]);
        write_jar(
            &lib.join("b-main.jar"),
            &[(MANIFEST_PATH, "<idea-plugin><id>from.b</id></idea-plugin>")],
        );
        write_jar(
            &lib.join("c-extra.jar"),
            &[(MANIFEST_PATH, "<idea-plugin><id>from.c</id></idea-plugin>")],
        );

        let registry = scan(root.path());
        assert!(registry.is_ok_and(|r| r.len() == 1 && r.contains_key("from.b")));
    }

    #[test]
    fn test_unpacked_descriptor_without_id_falls_back_to_jars() {
        let root = temp_root();
        let dir = write_unpacked(root.path(), "mixed", "<idea-plugin/>");
        let lib = dir.join(LIB_DIR);
        if fs::create_dir_all(&lib).is_err() {
            panic!("create lib dir");
        }
        write_jar(
            &lib.join("mixed.jar"),
            &[(MANIFEST_PATH, "<idea-plugin><id>mixed.id</id></idea-plugin>")],
        );

        assert!(read_plugin_dir(&dir).is_ok_and(|m| m.id == "mixed.id"));
    }

    #[test]
    fn test_duplicate_ids_later_directory_wins() {
        let root = temp_root();
        write_unpacked(root.path(), "a-foo", FOO_XML);
        let later = write_unpacked(root.path(), "b-foo", FOO_XML);

        let registry = scan(root.path());
        assert!(registry.is_ok_and(|r| r.len() == 1 && r["com.example.foo"].install_path == later));
    }

    #[test]
    fn test_scan_missing_directory_is_error() {
        let root = temp_root();
        let missing = root.path().join("nope");
        assert!(matches!(scan(&missing), Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn test_backup_folder_names() {
        assert_eq!(backup_folder_name("foo", 1_700_000_000, 0), "foo.bak.1700000000");
        assert_eq!(backup_folder_name("foo", 1_700_000_000, 2), "foo.bak.1700000000-2");
        assert!(is_backup_folder("foo.bak.1700000000"));
        assert!(is_backup_folder("foo.bak.1700000000-2"));
        assert!(!is_backup_folder("foo"));
        assert!(!is_backup_folder("foo.bak.latest"));
        assert!(!is_backup_folder(".bak.123"));
    }
}
