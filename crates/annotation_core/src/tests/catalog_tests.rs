use super::*;

fn event_type(id: &str, name: &str, description: &str) -> EventType {
    EventType {
        id: EventTypeId::from(id),
        name: name.to_string(),
        description: description.to_string(),
    }
}

fn catalog() -> EventCatalog {
    EventCatalog::new(vec![
        event_type("attack", "Attack", "A violent physical act"),
        event_type("kill", "Kill", "Someone causes the death of another"),
        event_type("die", "Die", "Life ends"),
        event_type("transport", "Transport", "Movement of people or goods"),
    ])
    .expect("catalog")
}

#[test]
fn rejects_duplicate_ids() {
    let err = EventCatalog::new(vec![
        event_type("kill", "Kill", ""),
        event_type("kill", "Kill again", ""),
    ])
    .expect_err("duplicate");
    assert!(matches!(err, AnnotationError::Configuration(_)));
}

#[test]
fn looks_up_by_id() {
    let catalog = catalog();
    assert_eq!(catalog.len(), 4);
    assert_eq!(
        catalog.get(&EventTypeId::from("die")).map(|t| t.name.as_str()),
        Some("Die")
    );
    assert!(catalog.get(&EventTypeId::from("marry")).is_none());
    assert!(matches!(
        catalog.ensure_known(&EventTypeId::from("marry")),
        Err(AnnotationError::InvalidEventType(_))
    ));
}

#[test]
fn search_matches_name_and_description_case_insensitively_in_catalog_order() {
    let catalog = catalog();
    let ids: Vec<&str> = catalog
        .search_all("DEATH")
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ids, vec!["kill"]);

    let ids: Vec<&str> = catalog
        .search_all("a")
        .into_iter()
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(ids, vec!["attack", "kill", "transport"]);
}

#[test]
fn inline_search_is_capped_and_ignores_blank_queries() {
    let types = (0..20)
        .map(|n| event_type(&format!("type-{n}"), &format!("Type {n}"), "shared text"))
        .collect();
    let catalog = EventCatalog::new(types).expect("catalog");

    assert_eq!(catalog.search_inline("shared").len(), INLINE_SEARCH_LIMIT);
    assert_eq!(catalog.search_all("shared").len(), 20);
    assert!(catalog.search_inline("   ").is_empty());
}
