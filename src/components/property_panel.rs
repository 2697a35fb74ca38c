//! Read-only property tree for the selected node.

use leptos::prelude::*;

use crate::graph::{GraphNode, Properties, PropertyValue};

use super::force_graph::display_name;

/// Left indent per nesting level, in pixels.
pub const INDENT_PX: usize = 16;

/// One row of the property tree.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyItem {
	Inline {
		name: String,
		text: String,
		depth: usize,
	},
	Group {
		name: String,
		depth: usize,
		children: Vec<PropertyItem>,
	},
}

/// Flattens a property set into displayable rows. Wrapped values show their
/// inner `value`; nested mappings become groups one level deeper.
pub fn property_items(properties: &Properties) -> Vec<PropertyItem> {
	items_at(properties, 0)
}

fn items_at(properties: &Properties, depth: usize) -> Vec<PropertyItem> {
	properties
		.iter()
		.map(|(name, value)| match value {
			PropertyValue::Nested(inner) => PropertyItem::Group {
				name: name.clone(),
				depth,
				children: items_at(inner, depth + 1),
			},
			leaf => PropertyItem::Inline {
				name: name.clone(),
				text: leaf.display_text().unwrap_or_default(),
				depth,
			},
		})
		.collect()
}

#[component]
pub fn PropertyPanel(#[prop(into)] node: Signal<Option<GraphNode>>, on_close: Callback<()>) -> impl IntoView {
	let title = move || {
		node.with(|n| {
			n.as_ref()
				.map(|n| format!("{} ({})", display_name(n), n.labels.join(", ")))
				.unwrap_or_default()
		})
	};
	let rows = move || {
		node.with(|n| n.as_ref().map(|n| property_items(&n.properties)).unwrap_or_default())
			.into_iter()
			.map(|item| view! { <PropertyRow item=item /> })
			.collect_view()
	};

	view! {
		<Show when=move || node.with(Option::is_some)>
			<aside class="property-panel">
				<header class="property-panel-header">
					<span class="property-panel-title">{title}</span>
					<button class="property-panel-close" title="Close" on:click=move |_| on_close.run(())>
						"×"
					</button>
				</header>
				<div class="property-tree">{rows}</div>
			</aside>
		</Show>
	}
}

#[component]
fn PropertyRow(item: PropertyItem) -> AnyView {
	match item {
		PropertyItem::Inline { name, text, depth } => view! {
			<div class="property-item" style:margin-left=format!("{}px", depth * INDENT_PX)>
				<span class="property-name">{format!("{}: ", name)}</span>
				<span class="property-value">{text}</span>
			</div>
		}
		.into_any(),
		PropertyItem::Group { name, depth, children } => {
			let open = RwSignal::new(true);
			view! {
				<div class="property-group" style:margin-left=format!("{}px", depth * INDENT_PX)>
					<div class="property-group-header" on:click=move |_| open.update(|o| *o = !*o)>
						<span class="property-toggle">{move || if open.get() { "▼" } else { "▶" }}</span>
						<span class="property-name">{name}</span>
					</div>
					<Show when=move || open.get()>
						{children
							.clone()
							.into_iter()
							.map(|child| view! { <PropertyRow item=child /> })
							.collect_view()}
					</Show>
				</div>
			}
			.into_any()
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::Scalar;
	use pretty_assertions::assert_eq;
	use serde_json::json;

	fn props(value: serde_json::Value) -> Properties {
		serde_json::from_value(value).unwrap()
	}

	#[test]
	fn scalars_render_inline() {
		let items = property_items(&props(json!({"Name": "Door", "Height": 2100, "IsExternal": false})));
		assert_eq!(
			items,
			vec![
				PropertyItem::Inline { name: "Height".into(), text: "2100".into(), depth: 0 },
				PropertyItem::Inline { name: "IsExternal".into(), text: "false".into(), depth: 0 },
				PropertyItem::Inline { name: "Name".into(), text: "Door".into(), depth: 0 },
			]
		);
	}

	#[test]
	fn wrapped_values_show_their_inner_value() {
		let items = property_items(&props(json!({"Width": {"type": "IfcLengthMeasure", "value": 900.5}})));
		assert_eq!(
			items,
			vec![PropertyItem::Inline { name: "Width".into(), text: "900.5".into(), depth: 0 }]
		);
	}

	#[test]
	fn nested_mappings_become_indented_groups() {
		let items = property_items(&props(json!({
			"Pset_DoorCommon": {"FireRating": "EI30", "Dims": {"Depth": {"value": 40}}}
		})));
		assert_eq!(
			items,
			vec![PropertyItem::Group {
				name: "Pset_DoorCommon".into(),
				depth: 0,
				children: vec![
					PropertyItem::Group {
						name: "Dims".into(),
						depth: 1,
						children: vec![PropertyItem::Inline { name: "Depth".into(), text: "40".into(), depth: 2 }],
					},
					PropertyItem::Inline { name: "FireRating".into(), text: "EI30".into(), depth: 1 },
				],
			}]
		);
	}

	#[test]
	fn lists_join_inline() {
		let mut p = Properties::new();
		p.insert(
			"Layers".into(),
			PropertyValue::List(vec![PropertyValue::text("Gypsum"), PropertyValue::Scalar(Scalar::Int(2))]),
		);
		assert_eq!(
			property_items(&p),
			vec![PropertyItem::Inline { name: "Layers".into(), text: "Gypsum, 2".into(), depth: 0 }]
		);
	}
}
