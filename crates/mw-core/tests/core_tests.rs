use mw_core::edit::{self, CloudTemplate, WeatherBlockStrategy, WeatherEdit};
use mw_core::legacy::{self, CLOSING_MARKER};
use mw_core::path::{self, KeyPath};
use mw_core::writer::{self, RootTerminator};
use mw_core::{
    Error, Key, Kind, LiteralNode, LookupError, NavigationError, ParseError, SubstitutionError, Table,
    TemplateError, parse_assignment, parse_fragment, serialize,
};

const MISSION: &str = r#"mission =
{
    ["date"] =
    {
        ["Day"] = 1,
        ["Year"] = 2011,
        ["Month"] = 6,
    }, -- end of ["date"]
    ["start_time"] = 43200,
    ["weather"] =
    {
        ["atmosphere_type"] = 0,
        ["clouds"] =
        {
            ["thickness"] = 200,
            ["density"] = 0,
            ["base"] = 300,
            ["iprecptns"] = 0,
        }, -- end of ["clouds"]
        ["name"] = "Winter, clean sky",
    }, -- end of ["weather"]
    ["coalition"] =
    {
        [1] = "red",
        [2] = "blue",
    }, -- end of ["coalition"]
    ["descriptionText"] = "Line one\
Line \"two\"",
    ["forcedOptions"] =
    {
    }, -- end of ["forcedOptions"]
    ["trig"] = true,
    ["magnitude"] = -1.25,
} -- end of mission
"#;

const TEMPLATE: &str = r#"["weather"] =
    {
        ["atmosphere_type"] = 0,
        ["clouds"] =
        {
            ["thickness"] = 1800,
            ["density"] = 7,
            ["preset"] = "Preset12",
            ["base"] = 2500,
            ["iprecptns"] = 1,
        }, -- end of ["clouds"]
        ["name"] = "Summer, overcast",
    }, -- end of ["weather"]
"#;

fn mission() -> Table {
    parse_assignment(MISSION).expect("parse mission").root
}

fn at<'t>(root: &'t Table, dotted: &str) -> &'t LiteralNode {
    path::get(root, KeyPath::parse(dotted).keys()).unwrap_or_else(|e| panic!("{}: {}", dotted, e))
}

#[test]
fn parses_mission_structure_in_order() {
    let doc = parse_assignment(MISSION).expect("parse");
    assert_eq!(doc.name, "mission");
    let keys: Vec<String> = doc.root.keys().map(|k| k.to_string()).collect();
    assert_eq!(
        keys,
        [
            "[\"date\"]",
            "[\"start_time\"]",
            "[\"weather\"]",
            "[\"coalition\"]",
            "[\"descriptionText\"]",
            "[\"forcedOptions\"]",
            "[\"trig\"]",
            "[\"magnitude\"]",
        ]
    );
    assert_eq!(at(&doc.root, "date.Month").as_number(), Some(6.0));
    assert_eq!(at(&doc.root, "coalition.2").as_str(), Some("blue"));
    assert_eq!(at(&doc.root, "descriptionText").as_str(), Some("Line one\nLine \"two\""));
    assert_eq!(at(&doc.root, "trig").as_bool(), Some(true));
    assert_eq!(at(&doc.root, "magnitude").as_number(), Some(-1.25));
    assert_eq!(at(&doc.root, "forcedOptions").as_table().map(Table::len), Some(0));
}

#[test]
fn round_trip_preserves_tree() {
    let root = mission();
    let text = serialize(&root, "mission");
    let again = parse_assignment(&text).expect("reparse");
    assert_eq!(again.name, "mission");
    assert_eq!(again.root, root);
    // and the emitted text is a fixed point
    assert_eq!(serialize(&again.root, "mission"), text);
}

#[test]
fn serializer_layout() {
    let mut date = Table::new();
    date.insert("Day", 15u32);
    date.insert("Month", 9u32);
    let mut root = Table::new();
    root.insert("date", date);
    root.insert("name", "a\\b");
    root.insert("ratio", 0.5);
    root.insert("on", false);
    let text = serialize(&root, "mission");
    let expected = concat!(
        "mission = \n",
        "{\n",
        "    [\"date\"] = \n",
        "    {\n",
        "        [\"Day\"] = 15,\n",
        "        [\"Month\"] = 9,\n",
        "    }, -- end of [\"date\"]\n",
        "    [\"name\"] = \"a\\\\b\",\n",
        "    [\"ratio\"] = 0.5,\n",
        "    [\"on\"] = false,\n",
        "} -- end of mission\n",
    );
    assert_eq!(text, expected);
}

#[test]
fn bare_root_terminator() {
    let mut root = Table::new();
    root.insert(1i64, "x");
    let text = writer::serialize_with(&root, "dictionary", RootTerminator::Bare);
    assert_eq!(text, "dictionary = \n{\n    [1] = \"x\",\n}\n");
    assert_eq!(parse_assignment(&text).unwrap().root, root);
}

#[test]
fn key_quoting_rule() {
    let mut root = Table::new();
    root.insert(Key::Index(1), "a");
    root.insert(Key::from("2x"), "b");
    let text = serialize(&root, "t");
    assert!(text.contains("    [1] = \"a\",\n"));
    assert!(text.contains("    [\"2x\"] = \"b\",\n"));
    let back = parse_assignment(&text).unwrap().root;
    let keys: Vec<&Key> = back.keys().collect();
    assert_eq!(keys, [&Key::Index(1), &Key::Name("2x".into())]);
}

#[test]
fn integer_text_keys_classify_as_indices() {
    assert_eq!(Key::classify("3"), Key::Index(3));
    assert_eq!(Key::classify("-7"), Key::Index(-7));
    assert_eq!(Key::classify("03"), Key::Name("03".into()));
    assert_eq!(Key::classify("+3"), Key::Name("+3".into()));
    assert_eq!(Key::classify("1.0"), Key::Name("1.0".into()));
    let root = parse_assignment("t = { [\"5\"] = 1, [6] = 2, [7.0] = 3 }").unwrap().root;
    let keys: Vec<&Key> = root.keys().collect();
    assert_eq!(keys, [&Key::Index(5), &Key::Index(6), &Key::Index(7)]);
}

#[test]
fn string_escaping_round_trip() {
    let original = "C:\\missions\\\"quoted\"\nsecond line\r\nthird";
    let mut root = Table::new();
    root.insert("s", original);
    let text = serialize(&root, "t");
    assert!(text.contains("\\\\missions"));
    assert!(text.contains("\\\"quoted\\\""));
    assert!(text.contains("\\\nsecond line"));
    let back = parse_assignment(&text).unwrap().root;
    assert_eq!(back.get(&Key::from("s")).and_then(LiteralNode::as_str), Some(original));
}

#[test]
fn number_forms() {
    let root = parse_assignment("t = { a = 0x1F, b = -.5, c = 1e3, d = 2.50, e = -0x10, f = 12345678901 }")
        .unwrap()
        .root;
    let n = |k: &str| root.get(&Key::from(k)).and_then(LiteralNode::as_number);
    assert_eq!(n("a"), Some(31.0));
    assert_eq!(n("b"), Some(-0.5));
    assert_eq!(n("c"), Some(1000.0));
    assert_eq!(n("d"), Some(2.5));
    assert_eq!(n("e"), Some(-16.0));
    assert_eq!(n("f"), Some(12345678901.0));
    assert_eq!(writer::format_number(1000.0), "1000");
    assert_eq!(writer::format_number(-3.0), "-3");
    assert_eq!(writer::format_number(0.1), "0.1");
    assert_eq!(writer::format_number(-281634.28571429), "-281634.28571429");
}

#[test]
fn lexical_forms() {
    let src = "-- leading comment\nt = --[[ block\ncomment ]] {\n  'single', [[long\nstring]], [==[with ]] inside]==],\n  nested = { deep = { deeper = {} } };\n  flag = nil,\n  esc = \"tab\\tbell\\7end\\65\",\n}\n-- end of t\n";
    let root = parse_assignment(src).unwrap().root;
    assert_eq!(root.get(&Key::Index(1)).and_then(LiteralNode::as_str), Some("single"));
    assert_eq!(root.get(&Key::Index(2)).and_then(LiteralNode::as_str), Some("long\nstring"));
    assert_eq!(root.get(&Key::Index(3)).and_then(LiteralNode::as_str), Some("with ]] inside"));
    assert_eq!(root.get(&Key::from("flag")), Some(&LiteralNode::Nil));
    assert_eq!(root.get(&Key::from("esc")).and_then(LiteralNode::as_str), Some("tab\tbell\u{7}endA"));
    assert!(path::table(&root, KeyPath::parse("nested.deep.deeper").keys()).is_ok());
}

#[test]
fn nil_values_survive_serialization() {
    let mut root = Table::new();
    root.insert("preset", LiteralNode::Nil);
    let text = serialize(&root, "t");
    assert!(text.contains("    [\"preset\"] = nil,\n"));
    assert_eq!(parse_assignment(&text).unwrap().root, root);
}

#[test]
fn duplicate_keys_keep_first_position_and_last_value() {
    let root = parse_assignment("t = { a = 1, b = 2, a = 3 }").unwrap().root;
    let keys: Vec<&Key> = root.keys().collect();
    assert_eq!(keys, [&Key::from("a"), &Key::from("b")]);
    assert_eq!(root.get(&Key::from("a")), Some(&LiteralNode::Number(3.0)));
}

#[test]
fn unsupported_values_are_rejected() {
    for (src, needle) in [
        ("t = { a = foo }", "identifier 'foo'"),
        ("t = { a = 1 + 2 }", "expression"),
        ("t = { a = function() end }", "function"),
        ("t = { a = f(1) }", "identifier 'f'"),
        ("t = { a = \"x\" .. \"y\" }", "expression"),
        ("t = { a = #b }", "length operator"),
    ] {
        match parse_assignment(src) {
            Err(ParseError::UnsupportedValue { what, .. }) => {
                assert!(what.contains(needle), "{}: {}", src, what)
            }
            other => panic!("{}: expected unsupported value, got {:?}", src, other),
        }
    }
    assert!(matches!(
        parse_assignment("t = \"not a table\""),
        Err(ParseError::UnsupportedValue { .. })
    ));
}

#[test]
fn unsupported_keys_are_rejected() {
    assert!(matches!(parse_assignment("t = { [1.5] = 1 }"), Err(ParseError::UnsupportedKey { .. })));
    assert!(matches!(parse_assignment("t = { [true] = 1 }"), Err(ParseError::UnsupportedKey { .. })));
}

#[test]
fn parse_errors_report_position() {
    let err = parse_assignment("t = {\n  a = 1,\n  b = 2\n  c = 3\n}").unwrap_err();
    assert!(matches!(err, ParseError::Expected { .. }), "{:?}", err);
    assert_eq!(err.position().line, 4);
    assert_eq!(err.position().column, 3);

    let err = parse_assignment("t = {\n  s = \"open\n}").unwrap_err();
    assert!(matches!(err, ParseError::UnterminatedString(_)));
    assert_eq!(err.position().line, 2);

    assert!(matches!(parse_assignment("t = { a = 1"), Err(ParseError::UnexpectedEof(_))));
    assert!(matches!(parse_assignment("t = {} x"), Err(ParseError::TrailingInput(_))));
    assert!(matches!(parse_assignment("t = { a = 12ab }"), Err(ParseError::InvalidNumber { .. })));
    assert!(matches!(parse_assignment("t = { a = \"\\q\" }"), Err(ParseError::InvalidEscape { .. })));
    assert!(matches!(parse_assignment("t = { a = \"\\300\" }"), Err(ParseError::InvalidEscape { .. })));
}

#[test]
fn nesting_depth_is_capped() {
    let depth = mw_core::parser::MAX_DEPTH + 1;
    let src = format!("t = {}{}", "{".repeat(depth), "}".repeat(depth));
    assert!(matches!(parse_assignment(&src), Err(ParseError::TooDeep { .. })));
    let ok = format!("t = {}{}", "{".repeat(depth - 1), "}".repeat(depth - 1));
    assert!(parse_assignment(&ok).is_ok());
}

#[test]
fn navigator_reports_typed_failures() {
    let root = mission();
    assert_eq!(
        path::get(&root, KeyPath::parse("date.Hour").keys()),
        Err(LookupError::NotFound { path: KeyPath::parse("date.Hour") })
    );
    assert_eq!(
        path::get(&root, KeyPath::parse("trig.x").keys()),
        Err(LookupError::NotATable { path: KeyPath::parse("trig"), found: Kind::Boolean })
    );
    assert!(path::get(&root, &[]).is_err());
    assert_eq!(path::table(&root, &[]).map(Table::len), Ok(root.len()));
    assert_eq!(KeyPath::parse("coalition.1").to_string(), "coalition.1");
}

#[test]
fn list_children_describes_entries() {
    let root = mission();
    let kids = path::list_children(&root, KeyPath::parse("weather").keys()).unwrap();
    assert_eq!(kids.len(), 3);
    assert_eq!(kids[1].key, Key::from("clouds"));
    assert_eq!(kids[1].kind, Kind::Table);
    assert_eq!(kids[1].len, Some(4));
    assert_eq!(kids[2].kind, Kind::String);
    assert_eq!(kids[2].len, None);
}

#[test]
fn set_date_touches_only_month_and_day() {
    let before = mission();
    let mut root = before.clone();
    edit::set_date(&mut root, 9, 15).unwrap();
    assert_eq!(at(&root, "date.Month").as_number(), Some(9.0));
    assert_eq!(at(&root, "date.Day").as_number(), Some(15.0));
    assert_eq!(at(&root, "date.Year").as_number(), Some(2011.0));

    // everything else is deep-equal once the two fields are put back
    let mut restored = root.clone();
    edit::set_date(&mut restored, 6, 1).unwrap();
    assert_eq!(restored, before);
}

#[test]
fn set_date_fails_closed() {
    let mut root = parse_assignment("mission = { [\"date\"] = { [\"Month\"] = 6 } }").unwrap().root;
    let before = root.clone();
    assert_eq!(edit::set_date(&mut root, 9, 15), Err(NavigationError::DayKeyMissing));
    assert_eq!(root, before);

    let mut root = parse_assignment("mission = { [\"date\"] = { [\"Day\"] = 6 } }").unwrap().root;
    assert_eq!(edit::set_date(&mut root, 9, 15), Err(NavigationError::MonthKeyMissing));

    let mut root = parse_assignment("mission = { [\"theatre\"] = \"Caucasus\" }").unwrap().root;
    assert_eq!(edit::set_date(&mut root, 9, 15), Err(NavigationError::DateTableMissing));

    let mut root = parse_assignment("mission = { date = \"today\" }").unwrap().root;
    assert_eq!(edit::set_date(&mut root, 9, 15), Err(NavigationError::DateTableMissing));

    let mut root = parse_assignment("mission = { date = { Month = \"June\", Day = 1 } }").unwrap().root;
    assert!(matches!(
        edit::set_date(&mut root, 9, 15),
        Err(NavigationError::UnexpectedType { expected: Kind::Number, found: Kind::String, .. })
    ));
}

#[test]
fn set_start_time_requires_key() {
    let mut root = mission();
    edit::set_start_time(&mut root, 3600).unwrap();
    assert_eq!(at(&root, "start_time").as_number(), Some(3600.0));

    let mut bare = parse_assignment("mission = { date = {} }").unwrap().root;
    assert_eq!(edit::set_start_time(&mut bare, 1), Err(NavigationError::StartTimeKeyMissing));
}

#[test]
fn set_clouds_writes_preset_or_nil() {
    let mut root = mission();
    let clouds = CloudTemplate {
        preset: Some("Preset7".into()),
        thickness: 400,
        density: 5,
        precipitation: 1,
        base: 1200,
    };
    edit::set_clouds(&mut root, &clouds).unwrap();
    assert_eq!(at(&root, "weather.clouds.preset").as_str(), Some("Preset7"));
    assert_eq!(at(&root, "weather.clouds.thickness").as_number(), Some(400.0));
    assert_eq!(at(&root, "weather.clouds.density").as_number(), Some(5.0));
    assert_eq!(at(&root, "weather.clouds.iprecptns").as_number(), Some(1.0));
    assert_eq!(at(&root, "weather.clouds.base").as_number(), Some(1200.0));

    edit::set_clouds(&mut root, &CloudTemplate { preset: None, ..clouds }).unwrap();
    assert_eq!(at(&root, "weather.clouds.preset"), &LiteralNode::Nil);
    let text = serialize(&root, "mission");
    assert!(text.contains("[\"preset\"] = nil,"));
}

#[test]
fn set_clouds_distinguishes_missing_tables() {
    let clouds = CloudTemplate::default();
    let mut no_weather = parse_assignment("mission = { date = {} }").unwrap().root;
    assert_eq!(edit::set_clouds(&mut no_weather, &clouds), Err(NavigationError::WeatherTableMissing));
    let mut no_clouds = parse_assignment("mission = { weather = { name = \"x\" } }").unwrap().root;
    assert_eq!(edit::set_clouds(&mut no_clouds, &clouds), Err(NavigationError::CloudsTableMissing));
}

#[test]
fn weather_fragment_shapes() {
    let legacy = edit::weather_from_fragment(TEMPLATE).unwrap();
    assert_eq!(legacy.get(&Key::from("name")).and_then(LiteralNode::as_str), Some("Summer, overcast"));

    let bare = edit::weather_from_fragment("{ name = \"bare\", clouds = {} }").unwrap();
    assert_eq!(bare.get(&Key::from("name")).and_then(LiteralNode::as_str), Some("bare"));

    let fields = edit::weather_from_fragment("[\"name\"] = \"fields\",\n[\"clouds\"] = {},").unwrap();
    assert_eq!(fields.len(), 2);

    assert!(matches!(
        edit::weather_from_fragment("   -- nothing here\n"),
        Err(Error::Template(TemplateError::NotATable))
    ));
    assert!(matches!(
        edit::weather_from_fragment("weather = 3"),
        Err(Error::Template(TemplateError::NotATable))
    ));
    assert!(parse_fragment("[\"a\"] = 1 [\"b\"] = 2").is_err());
}

#[test]
fn structural_weather_splice() {
    let mut root = mission();
    edit::set_weather_template(&mut root, TEMPLATE).unwrap();
    assert_eq!(at(&root, "weather.name").as_str(), Some("Summer, overcast"));
    assert_eq!(at(&root, "weather.clouds.thickness").as_number(), Some(1800.0));
    // the weather slot keeps its position
    let keys: Vec<&Key> = root.keys().collect();
    assert_eq!(keys[2], &Key::from("weather"));

    let mut no_weather = parse_assignment("mission = { date = {} }").unwrap().root;
    assert!(matches!(
        edit::set_weather_template(&mut no_weather, TEMPLATE),
        Err(Error::Navigation(NavigationError::WeatherTableMissing))
    ));
}

#[test]
fn apply_edit_is_all_or_nothing() {
    let mut root = parse_assignment(
        "mission = { date = { Day = 1, Month = 6 }, start_time = 0, weather = { name = \"old\" } }",
    )
    .unwrap()
    .root;
    let before = root.clone();
    let edit = WeatherEdit {
        day: 15,
        month: 9,
        start_time: Some(28800),
        weather_template: Some("{ name = \"new\" }".into()),
        clouds: Some(CloudTemplate::default()),
    };
    // date and weather would succeed; clouds table is missing
    let err = edit::apply_edit(&mut root, &edit, WeatherBlockStrategy::Structural).unwrap_err();
    assert!(matches!(err, Error::Navigation(NavigationError::CloudsTableMissing)));
    assert_eq!(root, before);

    let edit = WeatherEdit { clouds: None, ..edit };
    edit::apply_edit(&mut root, &edit, WeatherBlockStrategy::Structural).unwrap();
    assert_eq!(at(&root, "weather.name").as_str(), Some("new"));
    assert_eq!(at(&root, "start_time").as_number(), Some(28800.0));
    assert_eq!(at(&root, "date.Day").as_number(), Some(15.0));
}

#[test]
fn start_time_is_optional() {
    let mut root = parse_assignment("mission = { date = { Day = 1, Month = 6 }, weather = {} }").unwrap().root;
    let edit = WeatherEdit {
        day: 2,
        month: 3,
        start_time: None,
        weather_template: Some("{}".into()),
        clouds: None,
    };
    // `{}` is an empty fragment, so the weather template is rejected
    assert!(edit::apply_edit(&mut root, &edit, WeatherBlockStrategy::Structural).is_err());
    // under the textual strategy the template was spliced beforehand
    edit::apply_edit(&mut root, &edit, WeatherBlockStrategy::Textual).unwrap();
    assert_eq!(at(&root, "date.Month").as_number(), Some(3.0));
    assert!(root.get(&Key::from("start_time")).is_none());
}

#[test]
fn strategy_from_str() {
    assert_eq!("structural".parse::<WeatherBlockStrategy>(), Ok(WeatherBlockStrategy::Structural));
    assert_eq!("Textual".parse::<WeatherBlockStrategy>(), Ok(WeatherBlockStrategy::Textual));
    assert_eq!("legacy".parse::<WeatherBlockStrategy>(), Ok(WeatherBlockStrategy::Textual));
    assert!("regex".parse::<WeatherBlockStrategy>().is_err());
}

#[test]
fn legacy_substitution_keeps_one_marker() {
    let replacement = "[\"weather\"] = \n    {\n        [\"name\"] = \"Spliced\",\n    },";
    assert!(!replacement.contains(CLOSING_MARKER));
    let out = legacy::replace_weather_block(MISSION, replacement).unwrap();
    assert_eq!(out.matches(CLOSING_MARKER).count(), 1);
    let root = parse_assignment(&out).expect("spliced document parses").root;
    assert_eq!(at(&root, "weather.name").as_str(), Some("Spliced"));
    // siblings after the block are untouched
    assert_eq!(at(&root, "coalition.1").as_str(), Some("red"));
    assert_eq!(at(&root, "date.Month").as_number(), Some(6.0));
}

#[test]
fn legacy_substitution_with_marker_in_template() {
    let out = legacy::replace_weather_block(MISSION, TEMPLATE).unwrap();
    assert_eq!(out.matches(CLOSING_MARKER).count(), 1);
    let root = parse_assignment(&out).unwrap().root;
    assert_eq!(at(&root, "weather.clouds.preset").as_str(), Some("Preset12"));
}

#[test]
fn legacy_substitution_inserts_template_literally() {
    let replacement = "[\"weather\"] = { [\"name\"] = \"$1 ${0}\" },";
    let out = legacy::replace_weather_block(MISSION, replacement).unwrap();
    let root = parse_assignment(&out).unwrap().root;
    assert_eq!(at(&root, "weather.name").as_str(), Some("$1 ${0}"));
}

#[test]
fn legacy_substitution_failures() {
    let no_block = "mission = { [\"date\"] = {} } -- end of mission";
    assert!(matches!(
        legacy::replace_weather_block(no_block, TEMPLATE),
        Err(SubstitutionError::BlockNotFound)
    ));
    let doubled = format!("{}{}", TEMPLATE, TEMPLATE);
    assert!(matches!(
        legacy::replace_weather_block(MISSION, &doubled),
        Err(SubstitutionError::ClosingMarker { count: 2 })
    ));
}

#[test]
fn keys_with_line_breaks_round_trip() {
    let root = parse_assignment("t = { [\"a\\nb\"] = { x = 1 }, [\"c\\rd\"] = { y = 2 } }").unwrap().root;
    let text = serialize(&root, "t");
    assert!(text.contains("}, -- end of [\"a\\nb\"]\n"));
    let back = parse_assignment(&text).expect("reparse");
    assert_eq!(back.root, root);
    assert_eq!(
        back.root.get(&Key::from("a\nb")).and_then(LiteralNode::as_table).map(Table::len),
        Some(1)
    );
}

#[test]
fn legacy_substitution_requires_weather_opener() {
    let err = legacy::replace_weather_block(MISSION, "{ [\"name\"] = \"y\" },").unwrap_err();
    assert!(matches!(err, SubstitutionError::BlockNotFound), "{:?}", err);
}
