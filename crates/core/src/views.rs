//! View locations, component factories and output-area injections.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inputs handed to a component when it is instantiated.
pub type Inputs = Map<String, Value>;

/// Where in the UI a plugin component is mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ViewKind {
	SidebarVertical,
	SidebarHorizontal,
	OutputTop,
	OutputBottom,
	OutputRow,
	OutputToolbar,
}

impl fmt::Display for ViewKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			Self::SidebarVertical => "sidebarVertical",
			Self::SidebarHorizontal => "sidebarHorizontal",
			Self::OutputTop => "outputTop",
			Self::OutputBottom => "outputBottom",
			Self::OutputRow => "outputRow",
			Self::OutputToolbar => "outputToolbar",
		};
		f.write_str(name)
	}
}

/// Opaque reference to a component the presentation layer knows how to build.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentFactory(String);

impl ComponentFactory {
	pub fn new(name: impl Into<String>) -> Self {
		Self(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for ComponentFactory {
	fn from(name: &str) -> Self {
		Self::new(name)
	}
}

impl From<String> for ComponentFactory {
	fn from(name: String) -> Self {
		Self(name)
	}
}

/// A component contributed to the output area.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInjection {
	pub id: String,
	pub factory: ComponentFactory,
	pub inputs: Inputs,
}

impl ComponentInjection {
	/// Injection with a freshly generated id and no inputs.
	pub fn new(factory: impl Into<ComponentFactory>) -> Self {
		Self {
			id: crate::ids::guid(),
			factory: factory.into(),
			inputs: Inputs::new(),
		}
	}

	pub fn with_input(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
		self.inputs.insert(key.into(), value.into());
		self
	}
}

/// Published by [`Session::add_output_injection`](crate::Session::add_output_injection).
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionAddEvent {
	pub injection: ComponentInjection,
	pub kind: ViewKind,
}

/// Published by [`Session::remove_output_injection`](crate::Session::remove_output_injection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionRemoveEvent {
	pub id: String,
	pub kind: ViewKind,
}
