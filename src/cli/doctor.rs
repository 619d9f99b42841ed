use crate::server::config::AppConfig;
use std::path::Path;

pub async fn run() -> anyhow::Result<()> {
    println!("Shellgate Doctor\n");

    let config = match crate::server::load_config() {
        Ok(config) => {
            println!("Checking configuration... ✅ Loaded");
            config
        }
        Err(e) => {
            println!("Checking configuration... ❌ {}", e);
            anyhow::bail!("configuration could not be loaded");
        }
    };

    let mut all_ok = true;
    all_ok &= check_executable("command shell", &config.terminal.shell);
    all_ok &= check_executable("PTY shell", &config.terminal.pty_shell);
    all_ok &= check_script_root(&config).await;
    check_auth(&config);

    println!();
    if all_ok {
        println!("✅ All checks passed! Ready to run Shellgate.");
        Ok(())
    } else {
        anyhow::bail!("some checks failed, see above")
    }
}

fn check_executable(label: &str, path: &str) -> bool {
    print!("Checking {}... ", label);
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && is_executable(&meta) => {
            println!("✅ {}", path);
            true
        }
        Ok(_) => {
            println!("❌ {} is not an executable file", path);
            false
        }
        Err(e) => {
            println!("❌ {}: {}", path, e);
            false
        }
    }
}

#[cfg(unix)]
fn is_executable(meta: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_meta: &std::fs::Metadata) -> bool {
    true
}

async fn check_script_root(config: &AppConfig) -> bool {
    print!("Checking script root... ");
    let root = Path::new(&config.scripts.root);
    if let Err(e) = crate::server::path_guard(config).check_absolute(root) {
        println!("❌ {} ({})", root.display(), e.code());
        return false;
    }

    match tokio::fs::metadata(root).await {
        Ok(meta) if meta.is_dir() => {
            println!("✅ {}", root.display());
            true
        }
        Ok(_) => {
            println!("❌ {} exists but is not a directory", root.display());
            false
        }
        Err(_) => {
            println!("ℹ️  {} will be created on first save", root.display());
            true
        }
    }
}

fn check_auth(config: &AppConfig) {
    print!("Checking authentication... ");
    if !config.server.auth.enabled {
        println!("⚠️  Disabled, every endpoint is open");
    } else if std::env::var(crate::server::API_KEY_ENV).is_ok() {
        println!("✅ Admin key from environment");
    } else {
        println!("ℹ️  An admin key will be generated at startup");
    }
}
