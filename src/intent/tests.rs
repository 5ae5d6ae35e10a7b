use super::*;

#[test]
fn test_scenario_classification() {
    assert_eq!(classify("makeup for a date night").class, IntentClass::Scenario);
    assert_eq!(classify("gift for my sister").class, IntentClass::Scenario);
}

#[test]
fn test_category_classification() {
    assert_eq!(classify("moisturizers").class, IntentClass::Category);
    assert_eq!(classify("gentle cleansers").class, IntentClass::Category);
}

#[test]
fn test_lookup_classification() {
    assert_eq!(
        classify("the ordinary niacinamide 10% + zinc 1%").class,
        IntentClass::Lookup
    );
    assert_eq!(classify("cerave foaming facial cleanser 473ml").class, IntentClass::Lookup);
}

#[test]
fn test_title_caps_by_class() {
    assert_eq!(IntentClass::Scenario.title_cap(), 3);
    assert_eq!(IntentClass::Category.title_cap(), 2);
    assert_eq!(IntentClass::Lookup.title_cap(), 1);
}

#[test]
fn test_target_domain_detection() {
    assert_eq!(classify("winter jacket").target, TargetDomain::Human);
    assert_eq!(classify("jacket for my dog").target, TargetDomain::Pet);
    assert_eq!(classify("plush dinosaur toy").target, TargetDomain::Toy);
}

#[test]
fn test_cross_domain_titles_trip_exclusion_vocab() {
    assert!(title_is_cross_domain("Cozy Dog Raincoat", TargetDomain::Human));
    assert!(title_is_cross_domain("Fashion Doll Playset", TargetDomain::Human));
    assert!(!title_is_cross_domain("Waterproof Raincoat", TargetDomain::Human));
    // Same-domain vocabulary is fine.
    assert!(!title_is_cross_domain("Dog Raincoat", TargetDomain::Pet));
}
