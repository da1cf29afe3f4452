//! Filter construction over declared collection fields.
//!
//! Requests arrive either as a flat field→value map or as a list of clause
//! specs. Every clause is checked against the profile's declared fields
//! before it reaches the vector store; unknown fields and type mismatches
//! are dropped, never errors.

use qdrant_client::qdrant::{Condition, Filter, Range};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dossier_config::Profile;

/// Filter payload accepted on research requests.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum FilterRequest {
	Specs(Vec<FilterSpec>),
	Flat(Map<String, Value>),
}

/// One structured filter clause.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct FilterSpec {
	pub field: String,
	pub value: Value,
	#[serde(default)]
	pub match_type: MatchType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub range_op: Option<RangeOp>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
	#[default]
	Exact,
	Any,
	Text,
	Range,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeOp {
	Gt,
	Gte,
	Lt,
	Lte,
}

/// Validated conditions for one request against one collection profile.
pub fn conditions_for(request: &FilterRequest, profile: &Profile) -> Vec<Condition> {
	match request {
		FilterRequest::Specs(specs) => conditions_from_specs(specs, profile),
		FilterRequest::Flat(map) => conditions_from_flat(map, profile),
	}
}

/// Flat maps are scanned in the profile's field declaration order, so the
/// resulting clause order is deterministic. Keys outside the declared
/// fields are dropped.
pub fn conditions_from_flat(map: &Map<String, Value>, profile: &Profile) -> Vec<Condition> {
	let mut conditions = Vec::new();

	for field in &profile.fields {
		let Some(value) = map.get(&field.name) else { continue };
		let match_type = if value.is_array() { MatchType::Any } else { MatchType::Exact };
		let spec = FilterSpec {
			field: field.name.clone(),
			value: value.clone(),
			match_type,
			range_op: None,
		};

		conditions.extend(clause_condition(&spec));
	}

	conditions
}

/// Spec lists keep their own order; clauses naming undeclared fields are
/// dropped.
pub fn conditions_from_specs(specs: &[FilterSpec], profile: &Profile) -> Vec<Condition> {
	specs
		.iter()
		.filter(|spec| profile.fields.iter().any(|field| field.name == spec.field))
		.filter_map(clause_condition)
		.collect()
}

/// Tenant clause for one collection. Absent when the profile declares no
/// tenant field, which leaves the collection wholly shared.
pub fn owner_condition(profile: &Profile, owner: &str) -> Option<Condition> {
	profile.tenant_field.as_ref().map(|field| Condition::matches(field.clone(), owner.to_string()))
}

/// Builds the final query filter. All clauses are conjunctive; an empty
/// clause set yields no filter at all rather than a match-nothing filter.
pub fn build_filter(mut conditions: Vec<Condition>, owner: Option<Condition>) -> Option<Filter> {
	conditions.extend(owner);

	if conditions.is_empty() {
		return None;
	}

	Some(Filter { should: Vec::new(), min_should: None, must: conditions, must_not: Vec::new() })
}

/// Concatenates the clause sets of several filters. A merge over only
/// empty or absent filters normalizes back to "no filter".
pub fn merge_filters(filters: Vec<Option<Filter>>) -> Option<Filter> {
	let mut merged =
		Filter { should: Vec::new(), min_should: None, must: Vec::new(), must_not: Vec::new() };

	for filter in filters.into_iter().flatten() {
		merged.should.extend(filter.should);
		merged.must.extend(filter.must);
		merged.must_not.extend(filter.must_not);
	}

	if merged.should.is_empty() && merged.must.is_empty() && merged.must_not.is_empty() {
		return None;
	}

	Some(merged)
}

fn clause_condition(spec: &FilterSpec) -> Option<Condition> {
	match spec.match_type {
		MatchType::Exact => exact_condition(&spec.field, &spec.value),
		MatchType::Any => any_condition(&spec.field, &spec.value),
		MatchType::Text => {
			spec.value.as_str().map(|text| Condition::matches_text(spec.field.clone(), text))
		},
		MatchType::Range => range_condition(&spec.field, &spec.value, spec.range_op),
	}
}

fn exact_condition(field: &str, value: &Value) -> Option<Condition> {
	match value {
		Value::String(text) => Some(Condition::matches(field, text.clone())),
		Value::Bool(flag) => Some(Condition::matches(field, *flag)),
		Value::Number(number) => number.as_i64().map(|int| Condition::matches(field, int)),
		_ => None,
	}
}

fn any_condition(field: &str, value: &Value) -> Option<Condition> {
	let items = value.as_array()?;

	if items.is_empty() {
		return None;
	}
	if items.iter().all(Value::is_string) {
		let keywords =
			items.iter().filter_map(Value::as_str).map(str::to_string).collect::<Vec<_>>();

		return Some(Condition::matches(field, keywords));
	}
	if items.iter().all(|item| item.as_i64().is_some()) {
		let integers = items.iter().filter_map(Value::as_i64).collect::<Vec<_>>();

		return Some(Condition::matches(field, integers));
	}

	None
}

fn range_condition(field: &str, value: &Value, op: Option<RangeOp>) -> Option<Condition> {
	let number = value.as_f64()?;
	let op = op?;
	let mut range = Range::default();

	match op {
		RangeOp::Gt => range.gt = Some(number),
		RangeOp::Gte => range.gte = Some(number),
		RangeOp::Lt => range.lt = Some(number),
		RangeOp::Lte => range.lte = Some(number),
	}

	Some(Condition::range(field, range))
}
