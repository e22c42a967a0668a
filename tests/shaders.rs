//! Every shipped WGSL shader must parse and validate with naga.

use backdrop::shaders;

fn validate_wgsl(code: &str) -> Result<naga::Module, String> {
    let module = naga::front::wgsl::parse_str(code).map_err(|e| format!("WGSL parse error: {:?}", e))?;

    let mut validator = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    );
    validator
        .validate(&module)
        .map_err(|e| format!("WGSL validation error: {:?}", e))?;

    Ok(module)
}

fn entry_points(module: &naga::Module) -> Vec<&str> {
    module.entry_points.iter().map(|e| e.name.as_str()).collect()
}

#[test]
fn test_all_shaders_validate() {
    for (name, source) in shaders::ALL {
        if let Err(e) = validate_wgsl(source) {
            panic!("shader `{}` failed: {}", name, e);
        }
    }
}

#[test]
fn test_scene_shaders_expose_vs_and_fs() {
    for source in [shaders::TERRAIN, shaders::PARTICLES, shaders::STARS] {
        let module = validate_wgsl(source).unwrap();
        let names = entry_points(&module);
        assert!(names.contains(&"vs_main"));
        assert!(names.contains(&"fs_main"));
    }
}

#[test]
fn test_overlay_has_both_blend_entry_points() {
    let module = validate_wgsl(shaders::OVERLAY).unwrap();
    let names = entry_points(&module);
    assert!(names.contains(&"vs_main"));
    assert!(names.contains(&"fs_alpha"));
    assert!(names.contains(&"fs_difference"));
}

#[test]
fn test_post_shaders_use_fullscreen_vertex() {
    for source in [shaders::POST_BRIGHT, shaders::POST_BLUR, shaders::POST_COMPOSITE] {
        let module = validate_wgsl(source).unwrap();
        assert!(entry_points(&module).contains(&"vs_main"));
        assert!(entry_points(&module).contains(&"fs_main"));
    }
}
