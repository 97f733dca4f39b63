use admingrid::prelude::*;
use pretty_assertions::assert_eq;
use serde_json::json;

fn users(n: usize, named_foo: &[usize]) -> MemoryBackend {
    let backend = MemoryBackend::new();
    let docs = (1..=n)
        .map(|id| {
            let name = if named_foo.contains(&id) {
                "foo".to_string()
            } else {
                format!("user{}", id)
            };
            json!({"id": id, "name": name, "active": id % 2 == 0, "age": 18 + id % 50})
        })
        .collect();
    backend.insert_many("users", docs);
    backend
}

fn admin(backend: MemoryBackend) -> Admin<ModelStore<MemoryBackend>> {
    let models = ModelStore::new(backend).with_model(
        ModelMetadata::new("App\\User", "users")
            .field("name", FieldKind::String)
            .field("active", FieldKind::Boolean)
            .field("age", FieldKind::Integer),
    );
    let search = FilterOptions {
        global_search: true,
        ..Default::default()
    };
    let definition = AdminDefinition::new("admin.user", "App\\User")
        .filter(FilterDefinition::new("name").options(search))
        .filter(FilterDefinition::new("active"))
        .filter(FilterDefinition::new("age"));
    let settings = GridSettings::builder().per_page(10).per_page_options([10, 20]).build();
    Admin::new(definition, models, &FilterFactory::new(), &TypeGuesserChain::default())
        .expect("valid admin")
        .with_settings(settings)
}

#[test]
fn test_third_page_of_twenty_five_rows() {
    let mut admin = admin(users(25, &[]));
    let values = DatagridValues {
        page: Some(3),
        sort_by: Some("id".into()),
        ..Default::default()
    };
    let datagrid = admin.build_datagrid(values).unwrap();

    let pager = datagrid.pager().unwrap();
    assert_eq!(pager.last_page(), 3);
    assert_eq!(pager.query().first_result(), 20);
    let rows = pager.results(Hydration::Object).unwrap();
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[0]["id"], 21);
}

#[test]
fn test_equality_filter_on_hundred_rows() {
    let mut admin = admin(users(100, &[13, 77]));
    let values = DatagridValues::new().with("name", FilterData::with_type("equal", "foo"));
    let datagrid = admin.build_datagrid(values).unwrap();

    let pager = datagrid.pager().unwrap();
    assert_eq!(pager.nb_results(), 2);
    assert_eq!(pager.last_page(), 1);
    let ids: Vec<_> = pager
        .results(Hydration::Object)
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![13, 77]);
}

#[test]
fn test_inactive_values_leave_the_query_alone() {
    let mut admin = admin(users(10, &[]));
    let values = DatagridValues::new()
        .with("name", FilterData::new(""))
        .with("active", FilterData::new("all"))
        .with("age", FilterData::new(json!(null)));
    let datagrid = admin.build_datagrid(values).unwrap();

    let query = datagrid.query().unwrap();
    assert_eq!(query.cmd().filters().count(), 0);
    assert!(query.parameters().is_empty());
    assert!(!datagrid.has_active_filters());
    assert_eq!(datagrid.pager().unwrap().nb_results(), 10);
}

#[test]
fn test_or_group_is_and_ed_with_other_filters() {
    let mut admin = admin(users(20, &[]));
    let values = DatagridValues::new()
        .with("name", FilterData::with_type("ends_with", "1"))
        .with("age", FilterData::with_type("gte", 20))
        .with("active", FilterData::new("yes"));
    let datagrid = admin.build_datagrid(values).unwrap();
    datagrid.filter_mut("name").unwrap().set_condition(LogicalOp::Or);
    datagrid.filter_mut("age").unwrap().set_condition(LogicalOp::Or);

    let query = datagrid.query().unwrap();
    assert_eq!(
        query.cmd().to_sql(),
        r"SELECT * FROM users WHERE (name LIKE '%' || replace(replace(replace($1, '\', '\\'), '%', '\%'), '_', '\_') ESCAPE '\' OR age >= $3) AND active = $2"
    );

    // even ids are active; none of their names end in 1, so age decides
    let ids: Vec<_> = datagrid
        .pager()
        .unwrap()
        .results(Hydration::Object)
        .unwrap()
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect();
    assert_eq!(ids, vec![2, 4, 6, 8, 10, 12, 14, 16, 18, 20]);
    assert_eq!(datagrid.pager().unwrap().nb_results(), 10);
}

#[test]
fn test_request_map_through_admin() {
    let mut admin = admin(users(30, &[]));
    let request = DatagridValues::from_query_map([
        ("filter[active][value]", "no"),
        ("filter[_per_page]", "20"),
        ("filter[_sort_by]", "id"),
        ("filter[_sort_order]", "DESC"),
    ])
    .unwrap();
    let datagrid = admin.build_datagrid(request).unwrap();
    let pager = datagrid.pager().unwrap();
    assert_eq!(pager.max_per_page(), 20);
    assert_eq!(pager.nb_results(), 15);
    assert_eq!(pager.results(Hydration::Object).unwrap()[0]["id"], 29);
}

#[test]
fn test_persisted_filters_are_restored() {
    let admin = admin(users(30, &[]));
    let persister = SessionFilterPersister::new(MemorySession::new());
    let request = DatagridValues {
        page: Some(2),
        ..Default::default()
    }
    .with("active", FilterData::new("yes"));

    admin
        .filter_parameters(request.clone(), false, Some(&persister))
        .unwrap();
    let restored = admin
        .filter_parameters(DatagridValues::new(), false, Some(&persister))
        .unwrap();
    assert_eq!(restored, request);

    let mut admin = admin;
    let pager = admin.build_datagrid(restored).unwrap().pager().unwrap();
    assert_eq!(pager.page(), 2);
    assert_eq!(pager.nb_results(), 15);

    admin
        .filter_parameters(DatagridValues::new(), true, Some(&persister))
        .unwrap();
    assert!(persister.get("admin.user").unwrap().is_empty());
}

#[test]
fn test_search_then_list() {
    let mut admin = admin(users(12, &[3, 9]));
    let handler = SearchHandler::new(true);
    let pager = handler.search(&mut admin, "foo", 1, 10).unwrap().unwrap();
    assert_eq!(pager.nb_results(), 2);

    let datagrid = admin.datagrid().unwrap();
    assert_eq!(datagrid.values().get("name"), Some(&FilterData::new("foo")));
    assert_eq!(datagrid.filter("name").unwrap().condition(), LogicalOp::Or);
}

#[test]
fn test_pager_does_not_touch_the_datagrid_query() {
    let mut admin = admin(users(25, &[]));
    let datagrid = admin.build_datagrid(DatagridValues::new().with("active", FilterData::new("yes"))).unwrap();
    let before = datagrid.query().unwrap();
    datagrid.pager().unwrap();
    let after = datagrid.query().unwrap();
    assert_eq!(before.cmd(), after.cmd());
    assert_eq!(after.first_result(), 0);
    assert_eq!(after.max_results(), 0);
}

#[test]
fn test_huge_page_from_request_is_empty() {
    let mut admin = admin(users(25, &[]));
    let values = DatagridValues::from_query_map([("_page", "18446744073709551615")]).unwrap();
    let datagrid = admin.build_datagrid(values).unwrap();

    let pager = datagrid.pager().unwrap();
    assert_eq!(pager.nb_results(), 25);
    assert_eq!(pager.last_page(), 3);
    assert!(pager.results(Hydration::Object).unwrap().is_empty());
    assert_eq!(pager.next_page(), 3);
}

#[test]
fn test_unknown_sort_field_is_ignored() {
    let mut admin = admin(users(25, &[]));
    for field in ["(SELECT COUNT(*) FROM secrets); --", "password"] {
        let values = DatagridValues::from_query_map([("_sort_by", field)]).unwrap();
        let datagrid = admin.build_datagrid(values).unwrap();
        assert_eq!(datagrid.sort_by(), None);
        assert_eq!(datagrid.query().unwrap().sort_by(), None);
        assert_eq!(datagrid.results(Hydration::Object).unwrap().len(), 10);
    }

    let values = DatagridValues::from_query_map([("_sort_by", "age")]).unwrap();
    assert_eq!(admin.build_datagrid(values).unwrap().sort_by(), Some("age"));
}

#[test]
fn test_sorting_a_mixed_field() {
    let backend = users(30, &[]);
    backend.insert_many(
        "users",
        vec![
            json!({"id": 31, "name": 7, "active": true, "age": 40}),
            json!({"id": 32, "name": null, "active": true, "age": 40}),
            json!({"id": 33, "name": "10", "active": true, "age": 40}),
        ],
    );
    let mut admin = admin(backend);
    let values = DatagridValues {
        per_page: Some(20),
        sort_by: Some("name".into()),
        ..Default::default()
    };
    let pager = admin.build_datagrid(values).unwrap().pager().unwrap();
    assert_eq!(pager.results(Hydration::Object).unwrap()[0]["id"], 31);

    pager.set_page(2);
    pager.init().unwrap();
    let rows = pager.results(Hydration::Object).unwrap();
    assert_eq!(rows.len(), 13);
    assert_eq!(rows[12]["id"], 32);
}
