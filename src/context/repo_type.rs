use std::fmt;

/// Coarse repository flavor, used only to orient the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepositoryType {
    ShopifyTheme,
    NodeJs,
    Python,
    Ruby,
    Java,
    Rust,
    Go,
    Unknown,
}

impl RepositoryType {
    pub fn label(&self) -> &'static str {
        match self {
            RepositoryType::ShopifyTheme => "Shopify Theme",
            RepositoryType::NodeJs => "Node.js",
            RepositoryType::Python => "Python",
            RepositoryType::Ruby => "Ruby",
            RepositoryType::Java => "Java",
            RepositoryType::Rust => "Rust",
            RepositoryType::Go => "Go",
            RepositoryType::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for RepositoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// How a single path is tested against a detection rule.
#[derive(Debug, Clone, Copy)]
enum Marker {
    /// The final path component equals this name
    FileName(&'static str),
    /// The path ends with this suffix on a component boundary
    PathSuffix(&'static str),
    /// Some directory component (not the file name) equals this name
    DirSegment(&'static str),
}

impl Marker {
    fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches("./");
        match *self {
            Marker::FileName(name) => path.rsplit('/').next() == Some(name),
            Marker::PathSuffix(suffix) => {
                path == suffix
                    || path
                        .strip_suffix(suffix)
                        .is_some_and(|prefix| prefix.ends_with('/'))
            }
            Marker::DirSegment(dir) => {
                let mut parts: Vec<&str> = path.split('/').collect();
                parts.pop();
                parts.contains(&dir)
            }
        }
    }
}

/// Detection rules in priority order. The first rule with any matching path wins.
const RULES: &[(RepositoryType, &[Marker])] = &[
    (
        RepositoryType::ShopifyTheme,
        &[
            Marker::PathSuffix("config/settings_schema.json"),
            Marker::DirSegment("assets"),
            Marker::DirSegment("layout"),
            Marker::DirSegment("templates"),
        ],
    ),
    (RepositoryType::NodeJs, &[Marker::FileName("package.json")]),
    (
        RepositoryType::Python,
        &[
            Marker::FileName("requirements.txt"),
            Marker::FileName("pyproject.toml"),
            Marker::FileName("Pipfile"),
        ],
    ),
    (RepositoryType::Ruby, &[Marker::FileName("Gemfile")]),
    (
        RepositoryType::Java,
        &[
            Marker::FileName("pom.xml"),
            Marker::FileName("build.gradle"),
            Marker::FileName("build.gradle.kts"),
        ],
    ),
    (RepositoryType::Rust, &[Marker::FileName("Cargo.toml")]),
    (RepositoryType::Go, &[Marker::FileName("go.mod")]),
];

/// Classify a repository from its file listing.
///
/// Pure in the set of paths: neither path order nor duplicates change the
/// result.
pub fn detect_repository_type<S: AsRef<str>>(paths: &[S]) -> RepositoryType {
    RULES
        .iter()
        .find(|(_, markers)| {
            paths
                .iter()
                .any(|p| markers.iter().any(|m| m.matches(p.as_ref())))
        })
        .map(|(kind, _)| *kind)
        .unwrap_or(RepositoryType::Unknown)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_marker_alone() {
        let cases = [
            ("config/settings_schema.json", RepositoryType::ShopifyTheme),
            ("assets/theme.css", RepositoryType::ShopifyTheme),
            ("layout/theme.liquid", RepositoryType::ShopifyTheme),
            ("shop/templates/index.liquid", RepositoryType::ShopifyTheme),
            ("package.json", RepositoryType::NodeJs),
            ("requirements.txt", RepositoryType::Python),
            ("Gemfile", RepositoryType::Ruby),
            ("pom.xml", RepositoryType::Java),
            ("crates/core/Cargo.toml", RepositoryType::Rust),
            ("go.mod", RepositoryType::Go),
            ("README.md", RepositoryType::Unknown),
        ];
        for (path, expected) in cases {
            assert_eq!(detect_repository_type(&[path]), expected, "{}", path);
        }
    }

    #[test]
    fn test_earliest_rule_wins() {
        let paths = ["Cargo.toml", "package.json", "requirements.txt"];
        assert_eq!(detect_repository_type(&paths), RepositoryType::NodeJs);

        let paths = ["go.mod", "assets/app.js", "package.json"];
        assert_eq!(detect_repository_type(&paths), RepositoryType::ShopifyTheme);
    }

    #[test]
    fn test_detection_ignores_path_order() {
        let mut paths = vec!["Gemfile", "src/main.go", "go.mod", "pom.xml"];
        let forward = detect_repository_type(&paths);
        paths.reverse();
        assert_eq!(forward, detect_repository_type(&paths));
        assert_eq!(forward, RepositoryType::Ruby);
    }

    #[test]
    fn test_directory_markers_need_a_directory() {
        // A file merely named like a marker directory does not count.
        assert_eq!(
            detect_repository_type(&["docs/templates"]),
            RepositoryType::Unknown
        );
        assert_eq!(
            detect_repository_type(&["src/assetsManager.js"]),
            RepositoryType::Unknown
        );
    }

    #[test]
    fn test_file_markers_need_exact_names() {
        assert_eq!(
            detect_repository_type(&["package.json.bak"]),
            RepositoryType::Unknown
        );
        assert_eq!(
            detect_repository_type(&["mygo.mod"]),
            RepositoryType::Unknown
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(RepositoryType::ShopifyTheme.to_string(), "Shopify Theme");
        assert_eq!(RepositoryType::NodeJs.to_string(), "Node.js");
    }
}
