use sqlx::{Postgres, QueryBuilder};
use steam_core::CoreError;
use std::collections::HashMap;

/// One `field__op=value` condition from the query string
/// (`spec.md` §4.7 filter grammar). Document fields are compared via
/// `document->>'field'`; `id`/`name` use their promoted columns so the
/// btree indexes in `0001_create_apps.sql` apply.
struct FieldCondition {
  expr: &'static str,
  op: Op,
  raw_value: String,
}

enum Op {
  Eq,
  Ne,
  Gte,
  Lte,
  In,
  Nin,
  Like,
  Ilike,
  IsNull,
  Exists,
}

#[derive(Clone, Copy)]
enum FieldKind {
  Text,
  Int,
  Bool,
}

fn field_lookup(field: &str) -> Option<(&'static str, FieldKind)> {
  match field {
    "id" => Some(("id", FieldKind::Int)),
    "name" => Some(("name", FieldKind::Text)),
    "type" => Some(("(document->>'type')", FieldKind::Text)),
    "is_free" => Some(("(document->>'is_free')", FieldKind::Bool)),
    "total_recommendations" => Some(("(document->>'total_recommendations')", FieldKind::Int)),
    _ => None,
  }
}

enum MethodCondition {
  IsAvailableInCountries(Vec<String>),
  Discount { op: DiscountOp, value: u8 },
}

enum DiscountOp {
  Eq,
  Gte,
  Lte,
}

#[derive(Clone, Copy)]
pub enum SortDirection {
  Ascending,
  Descending,
}

pub struct Sort {
  field: SortField,
  pub direction: SortDirection,
}

enum SortField {
  Column(&'static str),
  Discount,
}

impl Sort {
  pub fn expression(&self, main_country: &str) -> String {
    match self.field {
      SortField::Column(c) => c.to_string(),
      SortField::Discount => discount_expr(main_country),
    }
  }
}

/// Parsed, not-yet-executed `GET /apps` query. `push_where` renders every
/// condition into a single `sqlx::QueryBuilder`, so `AppRepo::list`/`count`
/// share one code path for building the predicate.
pub struct ListQuery {
  field_conditions: Vec<FieldCondition>,
  method_conditions: Vec<MethodCondition>,
  search_ids: Option<Vec<i64>>,
  pub sorts: Vec<Sort>,
  main_country: String,
}

const RESERVED_PARAMS: &[&str] = &["page", "size", "order_by", "main_country", "search"];

impl ListQuery {
  pub fn parse(params: &HashMap<String, String>, main_country: &str) -> Result<Self, CoreError> {
    let mut field_conditions = Vec::new();
    let mut method_conditions = Vec::new();

    for (key, value) in params {
      if RESERVED_PARAMS.contains(&key.as_str()) {
        continue;
      }

      if key == "is_available_in_countries" {
        let countries = value.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        method_conditions.push(MethodCondition::IsAvailableInCountries(countries));
        continue;
      }

      if let Some(discount_condition) = parse_discount_method_filter(key, value)? {
        method_conditions.push(discount_condition);
        continue;
      }

      field_conditions.push(parse_field_condition(key, value)?);
    }

    let sorts = params
      .get("order_by")
      .map(|v| parse_sorts(v))
      .transpose()?
      .unwrap_or_default();

    Ok(Self {
      field_conditions,
      method_conditions,
      search_ids: None,
      sorts,
      main_country: main_country.to_string(),
    })
  }

  /// Attaches the id set returned by `SearchFilter::fulltext_search`
  /// (`spec.md` §4.8): the ReadPath intersects it with its own filter
  /// query via an `id ∈ {…}` clause.
  pub fn with_search_ids(mut self, ids: Vec<i64>) -> Self {
    self.search_ids = Some(ids);
    self
  }

  pub fn main_country(&self) -> &str {
    &self.main_country
  }

  pub fn push_where(&self, builder: &mut QueryBuilder<Postgres>) {
    let mut first = true;
    let mut push_and = |builder: &mut QueryBuilder<Postgres>| {
      builder.push(if first { " WHERE " } else { " AND " });
      first = false;
    };

    for condition in &self.field_conditions {
      push_and(builder);
      push_field_condition(builder, condition);
    }

    for condition in &self.method_conditions {
      push_and(builder);
      push_method_condition(builder, condition, &self.main_country);
    }

    if let Some(ids) = &self.search_ids {
      push_and(builder);
      builder.push("id = ANY(").push_bind(ids.clone()).push(")");
    }
  }
}

fn discount_expr(main_country: &str) -> String {
  format!(
    "(document->'prices'->'{}'->'price_story'->0->>'discount')::int",
    main_country.replace('\'', "")
  )
}

fn parse_discount_method_filter(key: &str, value: &str) -> Result<Option<MethodCondition>, CoreError> {
  let op = match key {
    "discount" => DiscountOp::Eq,
    "discount__gte" => DiscountOp::Gte,
    "discount__lte" => DiscountOp::Lte,
    _ => return Ok(None),
  };
  let value: u8 = value
    .parse()
    .map_err(|_| CoreError::Validation(format!("invalid discount filter value: {value}")))?;
  Ok(Some(MethodCondition::Discount { op, value }))
}

fn parse_field_condition(key: &str, value: &str) -> Result<FieldCondition, CoreError> {
  let (field, op) = split_field_and_op(key);
  let (expr, kind) = field_lookup(field).ok_or_else(|| CoreError::Validation(format!("unsupported filter field: {field}")))?;

  validate_value_for_kind(kind, op_requires_scalar(&op), value)?;

  Ok(FieldCondition {
    expr,
    op,
    raw_value: value.to_string(),
  })
}

fn split_field_and_op(key: &str) -> (&str, Op) {
  for (suffix, op) in [
    ("__gte", Op::Gte),
    ("__lte", Op::Lte),
    ("__nin", Op::Nin),
    ("__in", Op::In),
    ("__ilike", Op::Ilike),
    ("__like", Op::Like),
    ("__isnull", Op::IsNull),
    ("__exists", Op::Exists),
    ("__ne", Op::Ne),
  ] {
    if let Some(field) = key.strip_suffix(suffix) {
      return (field, op);
    }
  }
  (key, Op::Eq)
}

fn op_requires_scalar(op: &Op) -> bool {
  !matches!(op, Op::In | Op::Nin | Op::IsNull | Op::Exists)
}

fn validate_value_for_kind(kind: FieldKind, scalar: bool, value: &str) -> Result<(), CoreError> {
  if !scalar {
    return Ok(());
  }
  match kind {
    FieldKind::Int => value
      .parse::<i64>()
      .map(|_| ())
      .map_err(|_| CoreError::Validation(format!("expected an integer, got {value}"))),
    FieldKind::Bool => {
      if value == "true" || value == "false" {
        Ok(())
      } else {
        Err(CoreError::Validation(format!("expected true/false, got {value}")))
      }
    }
    FieldKind::Text => Ok(()),
  }
}

fn push_field_condition(builder: &mut QueryBuilder<Postgres>, condition: &FieldCondition) {
  builder.push(condition.expr);
  match condition.op {
    Op::Eq => {
      builder.push(" = ").push_bind(condition.raw_value.clone());
    }
    Op::Ne => {
      builder.push(" != ").push_bind(condition.raw_value.clone());
    }
    Op::Gte => {
      builder.push("::numeric >= ").push_bind(condition.raw_value.clone()).push("::numeric");
    }
    Op::Lte => {
      builder.push("::numeric <= ").push_bind(condition.raw_value.clone()).push("::numeric");
    }
    Op::Like => {
      builder.push(" LIKE ").push_bind(condition.raw_value.clone());
    }
    Op::Ilike => {
      builder.push(" ILIKE ").push_bind(condition.raw_value.clone());
    }
    Op::IsNull => {
      if condition.raw_value == "true" {
        builder.push(" IS NULL");
      } else {
        builder.push(" IS NOT NULL");
      }
    }
    Op::Exists => {
      // Only meaningful for a top-level document key; promoted columns
      // (`id`, `name`) always exist.
      builder.push(" IS NOT NULL");
    }
    Op::In => {
      let values: Vec<String> = condition.raw_value.split(',').map(|s| s.trim().to_string()).collect();
      builder.push(" = ANY(").push_bind(values).push(")");
    }
    Op::Nin => {
      let values: Vec<String> = condition.raw_value.split(',').map(|s| s.trim().to_string()).collect();
      builder.push(" != ALL(").push_bind(values).push(")");
    }
  }
}

fn push_method_condition(builder: &mut QueryBuilder<Postgres>, condition: &MethodCondition, main_country: &str) {
  match condition {
    MethodCondition::IsAvailableInCountries(countries) => {
      builder.push("(");
      for (i, cc) in countries.iter().enumerate() {
        if i > 0 {
          builder.push(" AND ");
        }
        builder.push(format!(
          "(document->'prices'->'{}'->>'is_available')::boolean = true",
          cc.replace('\'', "")
        ));
      }
      builder.push(")");
    }
    MethodCondition::Discount { op, value } => {
      builder.push(discount_expr(main_country));
      match op {
        DiscountOp::Eq => builder.push(" = ").push_bind(*value as i32),
        DiscountOp::Gte => builder.push(" >= ").push_bind(*value as i32),
        DiscountOp::Lte => builder.push(" <= ").push_bind(*value as i32),
      };
    }
  }
}

fn parse_sorts(order_by: &str) -> Result<Vec<Sort>, CoreError> {
  order_by
    .split(',')
    .filter(|s| !s.is_empty())
    .map(|token| {
      let (direction, field) = match token.chars().next() {
        Some('-') => (SortDirection::Descending, &token[1..]),
        Some('+') => (SortDirection::Ascending, &token[1..]),
        _ => (SortDirection::Ascending, token),
      };

      let sort_field = match field {
        "discount" => SortField::Discount,
        other => {
          let (expr, _) = field_lookup(other).ok_or_else(|| CoreError::Validation(format!("unsupported sort field: {other}")))?;
          SortField::Column(expr)
        }
      };

      Ok(Sort {
        field: sort_field,
        direction,
      })
    })
    .collect()
}
