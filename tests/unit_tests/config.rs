use particle_mesh::config::{ParameterError, ParameterStore, ParameterValue};

#[test]
fn nested_tables_become_key_prefixes() {
    let parameters = ParameterStore::from_toml_str(
        r#"
        top = 3

        [MapParticles]
        all_generic_newton = 1

        [MapParticlesHost]
        contained_tol = 1e-6

        [Outer.Inner]
        flag = true
        "#,
    )
    .unwrap();
    assert_eq!(parameters.len(), 4);
    assert_eq!(parameters.get_or("top", 0i64), 3);
    assert!(parameters.get_or("MapParticles/all_generic_newton", false));
    assert_eq!(parameters.get_or("MapParticlesHost/contained_tol", 1e-10), 1e-6);
    assert!(parameters.get_or("Outer/Inner/flag", false));
    assert!(parameters.contains("Outer/Inner/flag"));
    assert!(!parameters.contains("Outer/flag"));
}

#[test]
fn integers_convert_to_reals_but_not_vice_versa() {
    let parameters = ParameterStore::new().with("a", 2i64).with("b", 0.5);
    assert_eq!(parameters.try_get::<f64>("a").unwrap(), Some(2.0));
    assert_eq!(
        parameters.try_get::<i64>("b"),
        Err(ParameterError::TypeMismatch {
            key: "b".to_string(),
            value: ParameterValue::Real(0.5)
        })
    );
    assert_eq!(parameters.try_get::<usize>("missing").unwrap(), None);
}

#[test]
fn get_or_falls_back_on_type_mismatch() {
    let parameters = ParameterStore::new().with("MapParticlesNewton/newton_max_iteration", 2.5);
    assert_eq!(parameters.get_or("MapParticlesNewton/newton_max_iteration", 51usize), 51);
}

#[test]
fn negative_integers_are_not_usize() {
    let parameters = ParameterStore::new().with("n", -4i64);
    assert!(parameters.try_get::<usize>("n").is_err());
    assert_eq!(parameters.try_get::<i64>("n").unwrap(), Some(-4));
}

#[test]
fn unsupported_values_are_rejected() {
    assert!(ParameterStore::from_toml_str("name = \"newton\"").is_err());
    assert!(ParameterStore::from_toml_str("values = [1, 2]").is_err());
    assert!(ParameterStore::from_toml_str("not toml at all [").is_err());
    assert!(ParameterStore::from_toml_str("").unwrap().is_empty());
}
