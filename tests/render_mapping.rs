//! Tests for the design → rendering instructions mapping.

use serde_json::Value;

mod common;
use common::*;

use qrstudio::render::{map, Fill, RenderTarget, EXPORT_SIZE, PREVIEW_SIZE};

fn all_designs() -> Vec<StyleConfig> {
    let mut odd_colors = plain_config();
    odd_colors.set_foreground("not-a-color");
    odd_colors.set_background("rgb(1,2,3)");

    let mut shaped = premium_config();
    shaped.set_shape(Shape {
        dot: DotStyle::ClassyRounded,
        corner_square: CornerSquareStyle::Dot,
        corner_dot: CornerDotStyle::Square,
    });

    vec![
        StyleConfig::default(),
        plain_config(),
        plain_config().with_logo(test_logo()),
        plain_config().with_gradient("#111111", "#222222"),
        premium_config(),
        odd_colors,
        shaped,
    ]
}

#[test]
fn test_without_gated_never_has_image_or_gradient() {
    for config in all_designs() {
        for target in [RenderTarget::Preview, RenderTarget::Export] {
            let instructions = map(&config, false, target);
            assert!(instructions.image.is_none(), "image leaked for {:?}", config);
            assert!(!instructions.gradient_enabled(), "gradient leaked for {:?}", config);
        }
    }
}

#[test]
fn test_without_gated_keeps_free_styling() {
    let mut config = premium_config();
    config.set_foreground("#123456");
    config.set_background("#fafafa");
    config.set_shape(Shape {
        dot: DotStyle::Dots,
        corner_square: CornerSquareStyle::Square,
        corner_dot: CornerDotStyle::Square,
    });

    let instructions = map(&config, false, RenderTarget::Export);

    assert_eq!(instructions.dots_options.style, DotStyle::Dots);
    assert_eq!(instructions.corners_square_options.style, CornerSquareStyle::Square);
    assert_eq!(instructions.corners_dot_options.style, CornerDotStyle::Square);
    assert_eq!(instructions.background_options.color.as_str(), "#fafafa");
    assert_eq!(instructions.corners_square_options.color.as_str(), "#123456");
    assert_eq!(instructions.corners_dot_options.color.as_str(), "#123456");
    assert!(matches!(
        &instructions.dots_options.fill,
        Fill::Solid { color } if color.as_str() == "#123456"
    ));
}

#[test]
fn test_gradient_colors_the_corners() {
    for config in all_designs() {
        let instructions = map(&config, true, RenderTarget::Preview);
        if let Some(gradient) = instructions.gradient() {
            let [first, second] = &config.gradient().stops;
            assert_eq!(&instructions.corners_square_options.color, first);
            assert_eq!(&instructions.corners_dot_options.color, second);
            assert_eq!(&gradient.color_stops[0].color, first);
            assert_eq!(&gradient.color_stops[1].color, second);
            assert_eq!(gradient.rotation, 45);
        }
    }
}

#[test]
fn test_disabled_gradient_uses_foreground_everywhere() {
    let mut config = plain_config();
    config.set_gradient_stops("#ff0000", "#00ff00");
    config.set_foreground("#333333");

    let instructions = map(&config, true, RenderTarget::Preview);

    assert!(!instructions.gradient_enabled());
    assert_eq!(instructions.corners_square_options.color.as_str(), "#333333");
    assert_eq!(instructions.corners_dot_options.color.as_str(), "#333333");
}

#[test]
fn test_logo_reference_is_handed_through() {
    let logo = test_logo();
    let config = plain_config().with_logo(logo.clone());

    let instructions = map(&config, true, RenderTarget::Export);

    let image = instructions.image.expect("logo should be included");
    assert!(image.ptr_eq(&logo), "logo should not be copied or re-encoded");
}

#[test]
fn test_targets_differ_only_in_size_and_margin() {
    let config = premium_config();
    let preview = map(&config, true, RenderTarget::Preview);
    let export = map(&config, true, RenderTarget::Export);

    assert_eq!((preview.width, preview.height), (PREVIEW_SIZE, PREVIEW_SIZE));
    assert_eq!((export.width, export.height), (EXPORT_SIZE, EXPORT_SIZE));
    assert_eq!(preview.image_options.margin, 10);
    assert_eq!(export.image_options.margin, 20);
    assert_eq!(preview.image_options.image_size, export.image_options.image_size);

    assert_eq!(preview.dots_options, export.dots_options);
    assert_eq!(preview.corners_square_options, export.corners_square_options);
    assert_eq!(preview.corners_dot_options, export.corners_dot_options);
    assert_eq!(preview.image, export.image);
}

#[test]
fn test_malformed_colors_pass_through() {
    let mut config = plain_config();
    config.set_foreground("definitely not a color");

    let instructions = map(&config, false, RenderTarget::Preview);

    assert_eq!(
        instructions.corners_dot_options.color.as_str(),
        "definitely not a color"
    );
}

#[test]
fn test_json_uses_renderer_option_names() {
    let instructions = map(&premium_config(), true, RenderTarget::Export);
    let json: Value = serde_json::to_value(&instructions).unwrap();

    assert_eq!(json["width"], 1024);
    assert_eq!(json["data"], "https://shop.example/menu");
    assert_eq!(json["dotsOptions"]["type"], "rounded");
    assert_eq!(json["dotsOptions"]["gradient"]["type"], "linear");
    assert_eq!(json["dotsOptions"]["gradient"]["colorStops"][1]["color"], "#0000ff");
    assert_eq!(json["cornersSquareOptions"]["type"], "extra-rounded");
    assert_eq!(json["cornersDotOptions"]["color"], "#0000ff");
    assert_eq!(json["imageOptions"]["crossOrigin"], "anonymous");
    assert_eq!(json["image"], LOGO_DATA_URL);

    let free: Value = serde_json::to_value(map(&premium_config(), false, RenderTarget::Export)).unwrap();
    assert!(free.get("image").is_none());
    assert!(free["dotsOptions"].get("gradient").is_none());
    assert_eq!(free["dotsOptions"]["color"], "#000000");
}
