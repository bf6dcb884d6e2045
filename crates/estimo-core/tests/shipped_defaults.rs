// The defaults shipped in the repository must load and validate as-is.

use std::path::{Path, PathBuf};

use estimo_core::config::{ensure_config_files, load_config_from};

fn repo_defaults() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../defaults")
        .join("client.toml")
}

#[test]
fn shipped_client_toml_is_valid() {
    let base = std::env::temp_dir().join(format!("estimo_shipped_defaults_{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&base);
    std::fs::create_dir_all(base.join("defaults")).unwrap();
    std::fs::copy(repo_defaults(), base.join("defaults/client.toml")).unwrap();

    let copied = ensure_config_files(&base).unwrap();
    assert_eq!(copied, vec![base.join("config").join("client.toml")]);

    let config = load_config_from(&base).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:8000");
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.default_page_limit, 20);
    assert_eq!(config.downloads_dir, base.join("downloads"));

    let _ = std::fs::remove_dir_all(&base);
}
