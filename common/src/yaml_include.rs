use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use yaml_rust2::{Yaml, YamlLoader};

/// Loads a YAML file, resolving `!include <relative path>` lines first.
///
/// Included documents are merged in order, then the including file's own
/// content is merged on top, so local keys override included ones.
pub fn load_yaml_with_includes(path: &Path) -> Result<Yaml, Box<dyn Error>> {
    let res = process_includes_recursive(&path.to_path_buf())?;
    tracing::debug!(path = %path.display(), "Resolved yaml includes");
    Ok(res)
}

fn process_includes_recursive(path: &PathBuf) -> Result<Yaml, Box<dyn Error>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let base_path = path.parent().unwrap_or(Path::new(""));

    let (includes, rest): (Vec<&str>, Vec<&str>) = contents
        .lines()
        .partition(|&line| line.trim().starts_with("!include"));

    let processed_includes = includes
        .iter()
        .filter_map(|&line| line.trim().strip_prefix("!include"))
        .map(|include_path| process_includes_recursive(&base_path.join(include_path.trim())))
        .collect::<Result<Vec<Yaml>, _>>()?;

    let local = YamlLoader::load_from_str(&rest.join("\n"))?
        .into_iter()
        .fold(Yaml::Null, merge_yaml);

    let included = processed_includes.into_iter().fold(Yaml::Null, merge_yaml);
    Ok(merge_yaml(included, local))
}

/// Deep-merges `overlay` onto `base`. Mappings merge key by key; any other
/// overlay value replaces the base one, except `Null`, which leaves it as is.
fn merge_yaml(base: Yaml, overlay: Yaml) -> Yaml {
    match (base, overlay) {
        (Yaml::Hash(mut merged), Yaml::Hash(overlay)) => {
            for (key, value) in overlay {
                match merged.get_mut(&key) {
                    Some(existing) => {
                        let previous = std::mem::replace(existing, Yaml::Null);
                        *existing = merge_yaml(previous, value);
                    }
                    None => {
                        merged.insert(key, value);
                    }
                }
            }
            Yaml::Hash(merged)
        }
        (base, Yaml::Null) => base,
        (_, overlay) => overlay,
    }
}
