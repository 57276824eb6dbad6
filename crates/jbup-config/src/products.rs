//! Product lookup table for IDE build detection
//!
//! Maps a product code (the `RM` in `RM-252.23892.415`) to the launcher
//! binaries and macOS app bundle names that product ships with. The table is
//! plain data so callers and tests can substitute their own.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ProductSpec {
    /// Build prefix, e.g. `RM`
    pub code: String,
    /// Display name, e.g. `RubyMine`
    pub name: String,
    /// Launcher names looked up on `PATH`
    #[serde(default)]
    pub binaries: Vec<String>,
    /// App bundle names under `/Applications` (without `.app`)
    #[serde(default)]
    pub app_names: Vec<String>,
}

impl ProductSpec {
    fn new(code: &str, name: &str, binaries: &[&str], app_names: &[&str]) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            binaries: binaries.iter().map(|s| (*s).to_string()).collect(),
            app_names: app_names.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductTable {
    products: Vec<ProductSpec>,
}

impl ProductTable {
    pub fn new(products: Vec<ProductSpec>) -> Self {
        Self { products }
    }

    /// Products shipped by JetBrains at the time of writing
    pub fn builtin() -> Self {
        Self::new(vec![
            ProductSpec::new("RM", "RubyMine", &["rubymine", "rubymine.sh"], &["RubyMine"]),
            ProductSpec::new("IU", "IntelliJ IDEA", &["idea", "idea.sh"], &["IntelliJ IDEA"]),
            ProductSpec::new(
                "IC",
                "IntelliJ IDEA Community",
                &["idea", "idea.sh"],
                &["IntelliJ IDEA CE"],
            ),
            ProductSpec::new("PY", "PyCharm", &["pycharm", "pycharm.sh"], &["PyCharm"]),
            ProductSpec::new(
                "PC",
                "PyCharm Community",
                &["pycharm", "pycharm.sh"],
                &["PyCharm CE"],
            ),
            ProductSpec::new("GO", "GoLand", &["goland", "goland.sh"], &["GoLand"]),
            ProductSpec::new("WS", "WebStorm", &["webstorm", "webstorm.sh"], &["WebStorm"]),
            ProductSpec::new("CL", "CLion", &["clion", "clion.sh"], &["CLion"]),
            ProductSpec::new("PS", "PhpStorm", &["phpstorm", "phpstorm.sh"], &["PhpStorm"]),
            ProductSpec::new("RD", "Rider", &["rider", "rider.sh"], &["Rider"]),
            ProductSpec::new("DB", "DataGrip", &["datagrip", "datagrip.sh"], &["DataGrip"]),
            ProductSpec::new("RR", "RustRover", &["rustrover", "rustrover.sh"], &["RustRover"]),
        ])
    }

    pub fn products(&self) -> &[ProductSpec] {
        &self.products
    }

    pub fn by_code(&self, code: &str) -> Option<&ProductSpec> {
        self.products.iter().find(|p| p.code.eq_ignore_ascii_case(code))
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Default for ProductTable {
    fn default() -> Self {
        Self::builtin()
    }
}
