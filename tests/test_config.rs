use std::time::Duration;

use waypoint::config::Config;

#[test]
fn test_config_defaults() {
    let cfg = Config::default();

    assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.chunk_size, 512);
    assert_eq!(cfg.max_header_bytes, 8192);
    assert_eq!(cfg.read_timeout(), None);
}

#[test]
fn test_config_partial_yaml_keeps_defaults() {
    let cfg = Config::from_yaml_str("chunk_size: 1024\nread_timeout_ms: 250\n").unwrap();

    assert_eq!(cfg.chunk_size, 1024);
    assert_eq!(cfg.read_timeout(), Some(Duration::from_millis(250)));
    assert_eq!(cfg.listen_addr, "127.0.0.1:8080");
    assert_eq!(cfg.max_header_bytes, 8192);
}

#[test]
fn test_config_full_yaml() {
    let yaml = r#"
listen_addr: "0.0.0.0:9000"
chunk_size: 4096
max_header_bytes: 16384
read_timeout_ms: 5000
"#;
    let cfg = Config::from_yaml_str(yaml).unwrap();

    assert_eq!(
        cfg,
        Config {
            listen_addr: "0.0.0.0:9000".to_string(),
            chunk_size: 4096,
            max_header_bytes: 16384,
            read_timeout_ms: Some(5000),
        }
    );
}

#[test]
fn test_config_rejects_zero_chunk_size() {
    let err = Config::from_yaml_str("chunk_size: 0").unwrap_err();
    assert!(err.to_string().contains("chunk_size"));
}

#[test]
fn test_config_rejects_zero_header_limit() {
    assert!(Config::from_yaml_str("max_header_bytes: 0").is_err());
}

#[test]
fn test_config_rejects_bad_yaml() {
    assert!(Config::from_yaml_str("chunk_size: [1, 2]").is_err());
}

#[test]
fn test_config_missing_file() {
    let err = Config::from_file("/definitely/not/here.yaml").unwrap_err();
    assert!(format!("{err:#}").contains("reading config file"));
}

#[test]
fn test_config_clone() {
    let cfg1 = Config::default();
    let cfg2 = cfg1.clone();
    assert_eq!(cfg1, cfg2);
}

// Every assertion that touches process environment lives in this one test
// so parallel tests never see each other's variables.
#[test]
fn test_config_environment() {
    let path = std::env::temp_dir().join(format!("waypoint-config-{}.yaml", std::process::id()));
    std::fs::write(&path, "listen_addr: \"127.0.0.1:7000\"\nchunk_size: 64\n").unwrap();

    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("WAYPOINT_CONFIG");
    }
    assert_eq!(Config::load().listen_addr, "127.0.0.1:8080");

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:3000");
    }
    assert_eq!(Config::load().listen_addr, "0.0.0.0:3000");

    unsafe {
        std::env::remove_var("LISTEN");
        std::env::set_var("WAYPOINT_CONFIG", &path);
    }
    let cfg = Config::try_load().unwrap();
    assert_eq!(cfg.listen_addr, "127.0.0.1:7000");
    assert_eq!(cfg.chunk_size, 64);

    unsafe {
        std::env::set_var("LISTEN", "0.0.0.0:5000");
    }
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
    assert_eq!(cfg.chunk_size, 64);

    unsafe {
        std::env::set_var("WAYPOINT_CONFIG", "/definitely/not/here.yaml");
    }
    assert!(Config::try_load().is_err());
    let cfg = Config::load();
    assert_eq!(cfg.listen_addr, "0.0.0.0:5000");
    assert_eq!(cfg.chunk_size, 512);

    unsafe {
        std::env::remove_var("LISTEN");
        std::env::remove_var("WAYPOINT_CONFIG");
    }
    let _ = std::fs::remove_file(&path);
}
