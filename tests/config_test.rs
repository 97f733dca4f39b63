use admingrid::prelude::*;
use admingrid::parser::parse_all;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::PathBuf;

fn demo_config() -> GridConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/admingrid.toml");
    GridConfig::load(Some(&path)).expect("demo config")
}

fn demo_backend(config: &GridConfig) -> MemoryBackend {
    let backend = MemoryBackend::new();
    for admin in &config.admins {
        if let Some(fixture) = &admin.fixture {
            let content = std::fs::read_to_string(config.resolve(fixture)).unwrap();
            let docs: Vec<serde_json::Value> = serde_json::from_str(&content).unwrap();
            backend.insert_many(&admin.table, docs);
        }
    }
    backend
}

fn demo_admin(code: &str) -> Admin<ModelStore<MemoryBackend>> {
    let config = demo_config();
    let admin_config = config.admin(code).unwrap();
    let models = ModelStore::new(demo_backend(&config)).with_model(admin_config.model());
    Admin::new(
        admin_config.definition.clone(),
        models,
        &FilterFactory::new(),
        &TypeGuesserChain::default(),
    )
    .unwrap()
    .with_settings(config.grid.clone())
}

#[test]
fn test_demo_config_loads() {
    let config = demo_config();
    assert_eq!(config.grid.default_per_page, 5);
    let codes: Vec<_> = config.admins.iter().map(|a| a.definition.code.as_str()).collect();
    assert_eq!(codes, vec!["admin.book", "admin.member"]);
    assert!(config.admin("admin.nope").is_err());
}

#[test]
fn test_expressions_drive_the_datagrid() {
    let mut admin = demo_admin("admin.book");
    let mut values = DatagridValues::new();
    for expr in parse_all(["year>=1980", "genre=scifi"]).unwrap() {
        values.set(expr.name, expr.data);
    }
    let datagrid = admin.build_datagrid(values).unwrap();
    let rows = datagrid.results(Hydration::Object).unwrap().to_vec();

    assert!(!rows.is_empty());
    for row in &rows {
        assert!(row["year"].as_i64().unwrap() >= 1980);
        assert_eq!(row["genre"], json!("scifi"));
    }
}

#[test]
fn test_demo_search() {
    let mut admin = demo_admin("admin.book");
    let pager = SearchHandler::new(false)
        .search(&mut admin, "gibson", 1, 5)
        .unwrap()
        .expect("books are searchable");
    assert_eq!(pager.nb_results(), 2);

    let mut members = demo_admin("admin.member");
    assert!(
        SearchHandler::new(false)
            .search(&mut members, "ann", 1, 5)
            .unwrap()
            .is_none()
    );
}
