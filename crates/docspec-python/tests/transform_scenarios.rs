//! End-to-end transformation scenarios.
//!
//! Each test feeds a small docspec dump through [`convert_docspec`] and checks
//! the resulting project tree. Type resolution runs against a
//! [`StaticTypeParser`] so no Python interpreter is needed.

use std::collections::HashSet;

use docspec_core::reflection::{Reflection, ReflectionKind};
use docspec_core::types::TypeRef;
use docspec_python::transform::{convert_docspec, TransformOptions, TransformOutput};
use docspec_python::worker::{NullTypeParser, StaticTypeParser};
use serde_json::{json, Value};

// ============================================================================
// Helpers
// ============================================================================

fn dump(members: Value) -> String {
    json!([{
        "name": "zoo",
        "type": "module",
        "location": {"filename": "REPO_ROOT_PLACEHOLDER/src/zoo.py", "lineno": 1},
        "members": members
    }])
    .to_string()
}

fn convert(members: Value) -> TransformOutput {
    convert_docspec(&dump(members), TransformOptions::default(), &mut NullTypeParser)
        .expect("conversion should succeed")
}

fn class(name: &str, bases: &[&str], members: Value) -> Value {
    json!({"name": name, "type": "class", "bases": bases, "members": members})
}

fn method(name: &str, doc: Option<&str>) -> Value {
    let mut method = json!({
        "name": name,
        "type": "function",
        "args": [{"name": "self", "type": "POSITIONAL"}]
    });
    if let Some(doc) = doc {
        method["docstring"] = json!({"content": doc});
    }
    method
}

fn child<'a>(node: &'a Reflection, name: &str) -> &'a Reflection {
    node.find_child(name)
        .unwrap_or_else(|| panic!("`{}` has no child `{}`", node.name, name))
}

fn summary(node: &Reflection) -> &str {
    node.comment.as_ref().map(|c| c.summary_text()).unwrap_or("")
}

fn all_nodes(root: &Reflection) -> Vec<(u32, String)> {
    let mut nodes = Vec::new();
    root.walk(&mut |node| nodes.push((node.id, node.name.clone())));
    nodes
}

// ============================================================================
// Inheritance
// ============================================================================

mod inheritance {
    use super::*;

    #[test]
    fn subclass_inherits_documented_method() {
        let output = convert(json!([
            class("Animal", &[], json!([method("speak", Some("Make a sound."))])),
            class("Dog", &["Animal"], json!([]))
        ]));

        let root = &output.project.root;
        let animal = child(root, "Animal");
        let dog = child(root, "Dog");
        let speak = child(animal, "speak");
        let inherited = child(dog, "speak");

        assert_ne!(inherited.id, speak.id);
        let origin = inherited.inherited_from.as_ref().unwrap();
        assert_eq!(origin.name, "Animal.speak");
        assert_eq!(origin.target, Some(speak.id));
        assert_eq!(summary(inherited), "Make a sound.");

        assert_eq!(dog.extended_types[0].name, "Animal");
        assert_eq!(dog.extended_types[0].target, Some(animal.id));
        assert_eq!(animal.extended_by[0].target, Some(dog.id));

        let methods = dog.groups.iter().find(|g| g.title == "Methods").unwrap();
        assert_eq!(methods.children, vec![speak.id]);
        assert_eq!(output.stats.inherited_members, 1);
    }

    #[test]
    fn transitive_chain_attributes_to_origin() {
        let output = convert(json!([
            class("C", &["B"], json!([])),
            class("B", &["A"], json!([])),
            class("A", &[], json!([method("m", Some("Original."))]))
        ]));

        let root = &output.project.root;
        let a_m = child(child(root, "A"), "m").id;
        for name in ["B", "C"] {
            let m = child(child(root, name), "m");
            let origin = m.inherited_from.as_ref().unwrap();
            assert_eq!(origin.name, "A.m", "{}.m", name);
            assert_eq!(origin.target, Some(a_m));
            assert_eq!(summary(m), "Original.");
        }
    }

    #[test]
    fn documented_override_is_preserved() {
        let output = convert(json!([
            class("Base", &[], json!([method("run", Some("Base run."))])),
            class("Worker", &["Base"], json!([method("run", Some("Worker run."))]))
        ]));

        let worker = child(&output.project.root, "Worker");
        let run = child(worker, "run");
        assert_eq!(summary(run), "Worker run.");
        assert!(run.inherited_from.is_none());
        assert_eq!(worker.children.iter().filter(|c| c.name == "run").count(), 1);
    }

    #[test]
    fn undocumented_override_takes_ancestor_docs() {
        let output = convert(json!([
            class("Base", &[], json!([method("run", Some("Base run."))])),
            class("Worker", &["Base"], json!([method("run", None)]))
        ]));

        let root = &output.project.root;
        let base_run = child(child(root, "Base"), "run");
        let worker = child(root, "Worker");
        let run = child(worker, "run");
        assert_ne!(run.id, base_run.id);
        assert_eq!(summary(run), "Base run.");
        assert_eq!(run.inherited_from.as_ref().unwrap().name, "Base.run");
        let methods = worker.groups.iter().find(|g| g.title == "Methods").unwrap();
        assert_eq!(methods.children, vec![run.id]);
    }

    #[test]
    fn later_base_fills_in_undocumented_member() {
        let output = convert(json!([
            class("A", &[], json!([method("m", None)])),
            class("B", &["A"], json!([])),
            class("C", &[], json!([method("m", Some("C doc"))])),
            class("D", &["B", "C"], json!([]))
        ]));

        let root = &output.project.root;
        let c_m = child(child(root, "C"), "m").id;
        let d = child(root, "D");
        let m = child(d, "m");
        assert_eq!(summary(m), "C doc");
        let origin = m.inherited_from.as_ref().unwrap();
        assert_eq!(origin.name, "C.m");
        assert_eq!(origin.target, Some(c_m));
        assert_eq!(d.children.iter().filter(|c| c.name == "m").count(), 1);
    }

    #[test]
    fn unknown_ancestor_is_ignored() {
        let output = convert(json!([
            class("Model", &["pydantic.BaseModel"], json!([method("dump", Some("Dump."))]))
        ]));

        let model = child(&output.project.root, "Model");
        assert!(model.extended_types.is_empty());
        assert_eq!(model.children.len(), 1);
        assert_eq!(output.stats.inherited_members, 0);
    }

    #[test]
    fn generic_base_resolves_by_canonical_name() {
        let output = convert(json!([
            class("Storage", &[], json!([method("drop", Some("Drop it."))])),
            class("Dataset", &["Storage[dict]"], json!([]))
        ]));

        let dataset = child(&output.project.root, "Dataset");
        assert!(dataset.find_child("drop").is_some());
        assert_eq!(dataset.extended_types[0].name, "Storage");
    }
}

// ============================================================================
// Tree Invariants
// ============================================================================

mod invariants {
    use super::*;

    fn zoo() -> TransformOutput {
        let mut parser = StaticTypeParser::new()
            .with("Dog", json!({"type": "reference", "name": "Dog"}))
            .with(
                "Optional[Dog]",
                json!({"type": "union", "types": [
                    {"type": "reference", "name": "Dog"},
                    {"type": "literal", "value": null}
                ]}),
            );
        let input = dump(json!([
            class("Animal", &[], json!([
                method("speak", Some("Make a sound.")),
                method("eat", None),
                {"name": "legs", "type": "data", "datatype": "int"}
            ])),
            class("Dog", &["Animal"], json!([method("eat", None)])),
            class("Puppy", &["Dog"], json!([])),
            class("Kennel", &[], json!([
                {"name": "resident", "type": "data", "datatype": "Dog"},
                {"name": "adopt", "type": "function",
                 "docstring": {"content": "Take a dog in."},
                 "return_type": "Optional[Dog]",
                 "args": [
                    {"name": "self", "type": "POSITIONAL"},
                    {"name": "dog", "type": "POSITIONAL", "datatype": "Dog"}
                 ]}
            ]))
        ]));
        convert_docspec(&input, TransformOptions::default(), &mut parser)
            .expect("conversion should succeed")
    }

    #[test]
    fn ids_are_unique() {
        let output = zoo();
        let nodes = all_nodes(&output.project.root);
        let ids: HashSet<_> = nodes.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids.len(), nodes.len());
    }

    #[test]
    fn references_point_at_named_declarations() {
        let output = zoo();
        let nodes = all_nodes(&output.project.root);

        // Collect every linked reference, nested type arguments and
        // signature types included.
        let mut targets: Vec<(String, u32)> = Vec::new();
        output.project.root.clone().for_each_reference_mut(&mut |name, target| {
            if let Some(target) = target {
                targets.push((name.to_string(), *target));
            }
        });

        for (name, target) in &targets {
            // `inheritedFrom` names are qualified by the owning class.
            let simple = name.rsplit('.').next().unwrap_or(name);
            assert!(
                nodes.iter().any(|(id, n)| id == target && n == simple),
                "`{}` -> {}",
                name,
                target
            );
        }

        let dog = child(&output.project.root, "Dog").id;
        let adopt = child(child(&output.project.root, "Kennel"), "adopt");
        let signature = &adopt.signatures[0];
        assert_eq!(
            signature.parameters[0].type_ref.as_ref().and_then(TypeRef::target),
            Some(dog)
        );
        let Some(TypeRef::Union { types }) = &signature.type_ref else {
            panic!("return type is not a union: {:?}", signature.type_ref);
        };
        assert_eq!(types[0].target(), Some(dog));
        assert!(targets.len() >= 6);
    }

    #[test]
    fn symbol_map_covers_declarations() {
        let output = zoo();
        let root = &output.project.root;
        for name in ["Animal", "Dog", "Puppy", "Kennel"] {
            let entry = &output.project.symbol_id_map[&child(root, name).id];
            assert_eq!(entry.qualified_name, name);
            assert_eq!(entry.source_file_name, "/src/zoo.py");
        }

        let map = &output.project.symbol_id_map;
        for (id, name) in all_nodes(root).into_iter().filter(|(id, _)| *id != 0) {
            assert!(map.contains_key(&id), "`{}` ({}) has no map entry", name, id);
        }
        assert!(map.keys().all(|id| all_nodes(root).iter().any(|(n, _)| n == id)));
    }

    #[test]
    fn sorting_is_idempotent() {
        let output = zoo();
        let mut root = output.project.root.clone();
        docspec_core::grouping::sort_groups_and_children(&mut root);
        root.children
            .iter_mut()
            .for_each(docspec_core::grouping::sort_groups_and_children);
        assert_eq!(
            serde_json::to_value(&root).unwrap(),
            serde_json::to_value(&output.project.root).unwrap()
        );
    }

    #[test]
    fn group_entries_are_sorted_by_name() {
        let output = zoo();
        let dog = child(&output.project.root, "Dog");
        let methods = dog.groups.iter().find(|g| g.title == "Methods").unwrap();
        let names: Vec<_> = methods
            .children
            .iter()
            .map(|id| dog.find_child_by_group_entry(*id).unwrap().name.as_str())
            .collect();
        assert_eq!(names, vec!["eat", "speak"]);
    }
}

// ============================================================================
// Type Resolution
// ============================================================================

mod types {
    use super::*;

    #[test]
    fn parser_receives_one_deduplicated_batch() {
        let mut parser = StaticTypeParser::new()
            .with("str", json!({"type": "reference", "name": "str"}))
            .with(
                "Optional[int]",
                json!({"type": "union", "types": [
                    {"type": "reference", "name": "int"},
                    {"type": "literal", "value": null}
                ]}),
            );
        let input = dump(json!([
            {"name": "name", "type": "data", "datatype": "str"},
            {"name": "alias", "type": "data", "datatype": "str"},
            {"name": "size", "type": "data", "datatype": "Optional[int]"}
        ]));

        let output = convert_docspec(&input, TransformOptions::default(), &mut parser).unwrap();

        assert_eq!(parser.batches().len(), 1);
        let batch = &parser.batches()[0];
        assert_eq!(batch.iter().filter(|e| e.as_str() == "str").count(), 1);

        let root = &output.project.root;
        assert!(matches!(child(root, "size").type_ref, Some(TypeRef::Union { .. })));
        assert_eq!(child(root, "alias").type_ref.as_ref().and_then(TypeRef::name), Some("str"));
        assert_eq!(output.stats.resolved_types, 3);
    }

    #[test]
    fn inherited_copies_resolve_too() {
        let mut parser = StaticTypeParser::new().with(
            "int | None",
            json!({"type": "union", "types": [
                {"type": "reference", "name": "int"},
                {"type": "literal", "value": null}
            ]}),
        );
        let input = dump(json!([
            class("Base", &[], json!([
                {"name": "limit", "type": "data", "datatype": "int | None",
                 "docstring": {"content": "Upper bound."}}
            ])),
            class("Derived", &["Base"], json!([]))
        ]));

        let output = convert_docspec(&input, TransformOptions::default(), &mut parser).unwrap();
        let limit = child(child(&output.project.root, "Derived"), "limit");
        assert!(matches!(limit.type_ref, Some(TypeRef::Union { .. })));
    }
}

// ============================================================================
// Output Shape
// ============================================================================

mod output_shape {
    use super::*;

    #[test]
    fn project_serializes_as_typedoc() {
        let output = convert(json!([
            class("Animal", &[], json!([method("speak", Some("Make a sound."))]))
        ]));
        let value = serde_json::to_value(&output.project).unwrap();

        assert_eq!(value["id"], 0);
        assert_eq!(value["name"], "python");
        assert_eq!(value["kind"], ReflectionKind::Project.code());
        assert_eq!(value["kindString"], "Project");
        let animal = &value["children"][0];
        assert_eq!(animal["kind"], 128);
        assert_eq!(animal["children"][0]["signatures"][0]["kindString"], "Call signature");
        assert!(value["symbolIdMap"].is_object());
    }

    #[test]
    fn project_name_is_configurable() {
        let options = TransformOptions {
            project_name: "crawlee".to_string(),
            ..TransformOptions::default()
        };
        let output = convert_docspec(&dump(json!([])), options, &mut NullTypeParser).unwrap();
        assert_eq!(output.project.root.name, "crawlee");
        assert!(output.project.root.children.is_empty());
    }
}
