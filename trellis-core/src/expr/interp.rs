use std::cmp::Ordering;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::EvalError;
use crate::expr::ast::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::scope::{Params, Scope};
use crate::value::{Object, Value};

/// Tree-walking interpreter for one invocation.
///
/// Identifier lookup order: block locals, parameters, scope members.
/// Writes to a parameter name stay local to the invocation.
pub(crate) struct Interpreter<'a> {
    params: &'a Params,
    locals: IndexMap<String, Value>,
    scope: &'a mut dyn Scope,
}

enum Root {
    Name(String),
    Member(String),
}

struct Place {
    root: Root,
    path: Vec<Value>,
}

impl<'a> Interpreter<'a> {
    pub(crate) fn new(params: &'a Params, scope: &'a mut dyn Scope) -> Self {
        Self {
            params,
            locals: IndexMap::new(),
            scope,
        }
    }

    pub(crate) fn run(&mut self, program: &Program) -> Result<Value, EvalError> {
        for stmt in &program.body {
            match stmt {
                Stmt::Expr(expr) => {
                    self.eval(expr)?;
                }
                Stmt::Return(Some(expr)) => return self.eval(expr),
                Stmt::Return(None) => return Ok(Value::Undefined),
            }
        }
        Ok(Value::Undefined)
    }

    fn eval(&mut self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Ident(name) => self.lookup(name),
            Expr::This => Err(EvalError::type_error("`this` cannot be used as a value")),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.eval(item)?);
                }
                Ok(Value::from(out))
            }
            Expr::Object(entries) => {
                let mut obj = Object::new();
                for (key, value) in entries {
                    let v = self.eval(value)?;
                    obj.insert(key.clone(), v);
                }
                Ok(Value::from(obj))
            }
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if matches!(**object, Expr::This) {
                    return Ok(self.scope.get(property).unwrap_or_default());
                }
                let target = self.eval(object)?;
                member(&target, property, *optional)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                if matches!(**object, Expr::This) {
                    let key = self.eval(index)?;
                    return Ok(self.scope.get(&key.to_display_string()).unwrap_or_default());
                }
                let target = self.eval(object)?;
                let key = self.eval(index)?;
                index_value(&target, &key, *optional)
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::Unary { op, operand } => {
                let v = self.eval(operand)?;
                Ok(unary(*op, &v))
            }
            Expr::Binary { op, left, right } => {
                let l = self.eval(left)?;
                let r = self.eval(right)?;
                Ok(binary(*op, &l, &r))
            }
            Expr::Logical { op, left, right } => {
                let l = self.eval(left)?;
                let short_circuit = match op {
                    LogicalOp::And => !l.is_truthy(),
                    LogicalOp::Or => l.is_truthy(),
                    LogicalOp::Nullish => !l.is_nullish(),
                };
                if short_circuit { Ok(l) } else { self.eval(right) }
            }
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test)?.is_truthy() {
                    self.eval(consequent)
                } else {
                    self.eval(alternate)
                }
            }
            Expr::Assign { op, target, value } => {
                let place = self.place(target)?;
                let rhs = self.eval(value)?;
                let next = match op.0 {
                    None => rhs,
                    Some(bin) => {
                        let current = self.read(&place)?;
                        binary(bin, &current, &rhs)
                    }
                };
                self.write(&place, next.clone())?;
                Ok(next)
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.place(target)?;
                let old = self.read(&place)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write(&place, Value::Number(new))?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
        }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(v) = self.params.get(name) {
            return Ok(v.clone());
        }
        self.scope
            .get(name)
            .ok_or_else(|| EvalError::UndefinedIdentifier(name.to_string()))
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, EvalError> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(self.eval(arg)?);
        }
        Ok(out)
    }

    fn call(&mut self, callee: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        match callee {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                if matches!(**object, Expr::This) {
                    let args = self.eval_args(args)?;
                    return match self.scope.call(property, args) {
                        Some(result) => result,
                        None => Err(EvalError::NotCallable(format!("this.{property}"))),
                    };
                }
                if property == "push" && object.is_assignable() {
                    return self.push(object, args);
                }
                let target = self.eval(object)?;
                if *optional && target.is_nullish() {
                    return Ok(Value::Undefined);
                }
                let args = self.eval_args(args)?;
                call_method(&target, property, args)
            }
            Expr::Ident(name) => {
                let args = self.eval_args(args)?;
                if self.locals.contains_key(name) || self.params.contains_key(name) {
                    return Err(EvalError::NotCallable(name.clone()));
                }
                if let Some(v) = global_function(name, &args) {
                    return Ok(v);
                }
                if let Some(result) = self.scope.call(name, args) {
                    return result;
                }
                if self.scope.get(name).is_some() {
                    Err(EvalError::NotCallable(name.clone()))
                } else {
                    Err(EvalError::UndefinedIdentifier(name.clone()))
                }
            }
            _ => Err(EvalError::NotCallable("expression".to_string())),
        }
    }

    /// `path.push(..)` mutates the array stored at an assignable path.
    fn push(&mut self, object: &Expr, args: &[Expr]) -> Result<Value, EvalError> {
        let place = self.place(object)?;
        let mut items = match self.read(&place)? {
            Value::Array(items) => items,
            other => {
                return Err(EvalError::NotCallable(format!("{}.push", other.type_name())));
            }
        };
        let args = self.eval_args(args)?;
        Rc::make_mut(&mut items).extend(args);
        let len = items.len();
        self.write(&place, Value::Array(items))?;
        Ok(Value::from(len))
    }

    fn place(&mut self, expr: &Expr) -> Result<Place, EvalError> {
        match expr {
            Expr::Ident(name) => Ok(Place {
                root: Root::Name(name.clone()),
                path: Vec::new(),
            }),
            Expr::Member {
                object, property, ..
            } => {
                if matches!(**object, Expr::This) {
                    return Ok(Place {
                        root: Root::Member(property.clone()),
                        path: Vec::new(),
                    });
                }
                let mut place = self.place(object)?;
                place.path.push(Value::from(property.as_str()));
                Ok(place)
            }
            Expr::Index { object, index, .. } => {
                if matches!(**object, Expr::This) {
                    let key = self.eval(index)?;
                    return Ok(Place {
                        root: Root::Member(key.to_display_string()),
                        path: Vec::new(),
                    });
                }
                let mut place = self.place(object)?;
                let key = self.eval(index)?;
                place.path.push(key);
                Ok(place)
            }
            _ => Err(EvalError::type_error("invalid assignment target")),
        }
    }

    fn read_root(&self, root: &Root) -> Result<Value, EvalError> {
        match root {
            Root::Name(name) => self.lookup(name),
            Root::Member(name) => Ok(self.scope.get(name).unwrap_or_default()),
        }
    }

    fn read(&self, place: &Place) -> Result<Value, EvalError> {
        let mut current = self.read_root(&place.root)?;
        for key in &place.path {
            current = index_value(&current, key, false)?;
        }
        Ok(current)
    }

    fn write(&mut self, place: &Place, value: Value) -> Result<(), EvalError> {
        let value = if place.path.is_empty() {
            value
        } else {
            let root = self.read_root(&place.root)?;
            assign_path(root, &place.path, value)?
        };
        match &place.root {
            Root::Name(name) => {
                if self.locals.contains_key(name) || self.params.contains_key(name) {
                    self.locals.insert(name.clone(), value);
                    Ok(())
                } else {
                    self.scope.set(name, value)
                }
            }
            Root::Member(name) => self.scope.set(name, value),
        }
    }
}

/// How many holes an indexed write may open past the end of an array.
const MAX_ARRAY_GROWTH: usize = 1 << 16;

/// Copy-on-write update of `container[path...] = value`, returning the new container.
fn assign_path(container: Value, path: &[Value], value: Value) -> Result<Value, EvalError> {
    let Some((key, rest)) = path.split_first() else {
        return Ok(value);
    };
    match container {
        Value::Object(mut obj) => {
            let map = Rc::make_mut(&mut obj);
            let k = key.to_display_string();
            let child = map.get(&k).cloned().unwrap_or_default();
            let updated = assign_path(child, rest, value)?;
            map.insert(k, updated);
            Ok(Value::Object(obj))
        }
        Value::Array(mut items) => {
            let Some(i) = as_index(key) else {
                return Err(EvalError::type_error(format!(
                    "cannot set property '{key}' of an array"
                )));
            };
            let vec = Rc::make_mut(&mut items);
            if i >= vec.len() {
                let len = i
                    .checked_add(1)
                    .filter(|&len| len - vec.len() <= MAX_ARRAY_GROWTH)
                    .ok_or_else(|| {
                        EvalError::type_error(format!(
                            "index {key} is too far past the end of an array of length {}",
                            vec.len()
                        ))
                    })?;
                vec.resize(len, Value::Undefined);
            }
            let child = std::mem::take(&mut vec[i]);
            vec[i] = assign_path(child, rest, value)?;
            Ok(Value::Array(items))
        }
        other => Err(EvalError::type_error(format!(
            "cannot set properties of {} (setting '{key}')",
            other.type_name()
        ))),
    }
}

fn as_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
        Value::Str(s) => s.parse().ok(),
        _ => None,
    }
}

fn member(target: &Value, property: &str, optional: bool) -> Result<Value, EvalError> {
    match target {
        Value::Undefined | Value::Null => {
            if optional {
                Ok(Value::Undefined)
            } else {
                Err(EvalError::type_error(format!(
                    "cannot read properties of {} (reading '{property}')",
                    target.type_name()
                )))
            }
        }
        Value::Str(s) if property == "length" => Ok(Value::from(s.chars().count())),
        Value::Array(items) => {
            if property == "length" {
                return Ok(Value::from(items.len()));
            }
            Ok(property
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .unwrap_or_default())
        }
        Value::Object(obj) => Ok(obj.get(property).cloned().unwrap_or_default()),
        _ => Ok(Value::Undefined),
    }
}

fn index_value(target: &Value, key: &Value, optional: bool) -> Result<Value, EvalError> {
    match (target, as_index(key)) {
        (Value::Array(items), Some(i)) => Ok(items.get(i).cloned().unwrap_or_default()),
        (Value::Str(s), Some(i)) => Ok(s
            .chars()
            .nth(i)
            .map(|c| Value::from(c.to_string()))
            .unwrap_or_default()),
        _ => member(target, &key.to_display_string(), optional),
    }
}

fn global_function(name: &str, args: &[Value]) -> Option<Value> {
    let first = args.first();
    match name {
        "String" => Some(Value::from(
            first.map(Value::to_display_string).unwrap_or_default(),
        )),
        "Number" => Some(Value::Number(first.map(Value::to_number).unwrap_or(0.0))),
        "Boolean" => Some(Value::Bool(first.is_some_and(Value::is_truthy))),
        _ => None,
    }
}

fn slice_bounds(len: usize, args: &[Value]) -> (usize, usize) {
    let resolve = |v: Option<&Value>, default: usize| -> usize {
        match v {
            None | Some(Value::Undefined) => default,
            Some(v) => {
                let n = v.to_number();
                if n.is_nan() {
                    0
                } else if n < 0.0 {
                    (len as f64 + n).max(0.0) as usize
                } else {
                    (n as usize).min(len)
                }
            }
        }
    };
    let start = resolve(args.first(), 0);
    let end = resolve(args.get(1), len);
    (start, end.max(start))
}

fn call_method(target: &Value, name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
    match (target, name) {
        (_, "toString") => Ok(Value::from(target.to_display_string())),
        (Value::Number(n), "toFixed") => {
            let digits = arg(0).to_number();
            let digits = if digits.is_nan() {
                0
            } else {
                digits.clamp(0.0, 100.0) as usize
            };
            Ok(Value::from(format!("{:.*}", digits, n)))
        }
        (Value::Str(s), "toUpperCase") => Ok(Value::from(s.to_uppercase())),
        (Value::Str(s), "toLowerCase") => Ok(Value::from(s.to_lowercase())),
        (Value::Str(s), "trim") => Ok(Value::from(s.trim())),
        (Value::Str(s), "includes") => Ok(Value::Bool(s.contains(arg(0).to_display_string().as_str()))),
        (Value::Str(s), "startsWith") => {
            Ok(Value::Bool(s.starts_with(arg(0).to_display_string().as_str())))
        }
        (Value::Str(s), "endsWith") => {
            Ok(Value::Bool(s.ends_with(arg(0).to_display_string().as_str())))
        }
        (Value::Str(s), "indexOf") => {
            let needle = arg(0).to_display_string();
            Ok(Value::Number(match s.find(needle.as_str()) {
                Some(byte) => s[..byte].chars().count() as f64,
                None => -1.0,
            }))
        }
        (Value::Str(s), "slice") => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), &args);
            Ok(Value::from(chars[start..end].iter().collect::<String>()))
        }
        (Value::Str(s), "split") => {
            let sep = arg(0);
            let parts: Vec<Value> = if sep.is_nullish() {
                vec![target.clone()]
            } else {
                let sep = sep.to_display_string();
                if sep.is_empty() {
                    s.chars().map(|c| Value::from(c.to_string())).collect()
                } else {
                    s.split(sep.as_str()).map(Value::from).collect()
                }
            };
            Ok(Value::from(parts))
        }
        (Value::Array(items), "includes") => {
            let needle = arg(0);
            Ok(Value::Bool(items.iter().any(|v| v.strict_eq(&needle))))
        }
        (Value::Array(items), "indexOf") => {
            let needle = arg(0);
            Ok(Value::Number(
                items
                    .iter()
                    .position(|v| v.strict_eq(&needle))
                    .map(|i| i as f64)
                    .unwrap_or(-1.0),
            ))
        }
        (Value::Array(items), "join") => {
            let sep = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(v) => v.to_display_string(),
            };
            let parts: Vec<String> = items
                .iter()
                .map(|v| {
                    if v.is_nullish() {
                        String::new()
                    } else {
                        v.to_display_string()
                    }
                })
                .collect();
            Ok(Value::from(parts.join(&sep)))
        }
        (Value::Array(items), "slice") => {
            let (start, end) = slice_bounds(items.len(), &args);
            Ok(Value::from(items[start..end].to_vec()))
        }
        (Value::Array(items), "concat") => {
            let mut out = items.to_vec();
            for extra in args.iter() {
                match extra {
                    Value::Array(more) => out.extend(more.iter().cloned()),
                    other => out.push(other.clone()),
                }
            }
            Ok(Value::from(out))
        }
        _ => Err(EvalError::NotCallable(format!(
            "{}.{name}",
            target.type_name()
        ))),
    }
}

fn unary(op: UnaryOp, v: &Value) -> Value {
    match op {
        UnaryOp::Not => Value::Bool(!v.is_truthy()),
        UnaryOp::Neg => Value::Number(-v.to_number()),
        UnaryOp::Plus => Value::Number(v.to_number()),
        UnaryOp::TypeOf => Value::from(match v {
            Value::Undefined => "undefined",
            Value::Null | Value::Array(_) | Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
        }),
    }
}

fn is_stringish(v: &Value) -> bool {
    matches!(v, Value::Str(_) | Value::Array(_) | Value::Object(_))
}

fn compare(l: &Value, r: &Value) -> Option<Ordering> {
    match (l, r) {
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        _ => l.to_number().partial_cmp(&r.to_number()),
    }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            if is_stringish(l) || is_stringish(r) {
                Value::from(format!("{}{}", l.to_display_string(), r.to_display_string()))
            } else {
                Value::Number(l.to_number() + r.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(l.to_number() - r.to_number()),
        BinaryOp::Mul => Value::Number(l.to_number() * r.to_number()),
        BinaryOp::Div => Value::Number(l.to_number() / r.to_number()),
        BinaryOp::Rem => Value::Number(l.to_number() % r.to_number()),
        BinaryOp::Lt => Value::Bool(compare(l, r) == Some(Ordering::Less)),
        BinaryOp::Le => Value::Bool(matches!(
            compare(l, r),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::Gt => Value::Bool(compare(l, r) == Some(Ordering::Greater)),
        BinaryOp::Ge => Value::Bool(matches!(
            compare(l, r),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::Eq => Value::Bool(l.loose_eq(r)),
        BinaryOp::NotEq => Value::Bool(!l.loose_eq(r)),
        BinaryOp::StrictEq => Value::Bool(l.strict_eq(r)),
        BinaryOp::StrictNotEq => Value::Bool(!l.strict_eq(r)),
    }
}
