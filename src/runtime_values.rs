use super::*;

/// Outcome of running script-level code: `Ok` for a normal return, `Err`
/// carrying the thrown value.
pub type Completion = std::result::Result<Value, Value>;

type NativeFn = dyn Fn(&Value, &[Value]) -> Completion;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<ObjectValue>>),
    Function(Rc<FunctionValue>),
    Promise(PromiseView),
    Error(Rc<ErrorValue>),
}

impl Value {
    pub fn function(
        name: impl Into<String>,
        body: impl Fn(&Value, &[Value]) -> Completion + 'static,
    ) -> Self {
        Self::Function(Rc::new(FunctionValue {
            name: name.into(),
            body: Box::new(body),
            properties: Rc::new(RefCell::new(ObjectValue::default())),
        }))
    }

    pub fn object(entries: Vec<(String, Value)>) -> Self {
        Self::Object(Rc::new(RefCell::new(ObjectValue::new(entries))))
    }

    /// An object whose `key` is an accessor; reading it calls `getter` with
    /// the object as `this`.
    pub fn object_with_getter(key: impl Into<String>, getter: Value) -> Self {
        let mut object = ObjectValue::default();
        object.define_getter(key, getter);
        Self::Object(Rc::new(RefCell::new(object)))
    }

    pub fn array(values: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(values)))
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Error(Rc::new(ErrorValue {
            kind,
            message: message.into(),
        }))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Function(_))
    }

    /// Arrays, objects and functions take part in thenable detection;
    /// primitives, promises and error values do not.
    pub(crate) fn is_object_like(&self) -> bool {
        matches!(self, Self::Array(_) | Self::Object(_) | Self::Function(_))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_promise(&self) -> Option<&PromiseView> {
        match self {
            Self::Promise(promise) => Some(promise),
            _ => None,
        }
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Completion {
        match self {
            Self::Function(function) => function.call(this, args),
            other => Err(Value::error(
                ErrorKind::TypeError,
                format!("{} is not a function", other.type_name()),
            )),
        }
    }

    /// Property read with accessor semantics. Reads on values without
    /// properties produce `undefined`.
    pub fn get(&self, key: &str) -> Completion {
        match self {
            Self::Object(object) => ObjectValue::get(object, self, key),
            Self::Function(function) => ObjectValue::get(&function.properties, self, key),
            Self::Array(values) if key == "length" => Ok(Value::Number(values.borrow().len() as f64)),
            _ => Ok(Value::Undefined),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
            Self::Array(_) | Self::Object(_) | Self::Promise(_) | Self::Error(_) => "object",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(left), Self::Bool(right)) => left == right,
            (Self::Number(left), Self::Number(right)) => left == right,
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => Rc::ptr_eq(left, right),
            (Self::Object(left), Self::Object(right)) => Rc::ptr_eq(left, right),
            (Self::Function(left), Self::Function(right)) => Rc::ptr_eq(left, right),
            (Self::Promise(left), Self::Promise(right)) => left == right,
            (Self::Error(left), Self::Error(right)) => Rc::ptr_eq(left, right),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("Undefined"),
            Self::Null => f.write_str("Null"),
            Self::Bool(value) => write!(f, "Bool({value})"),
            Self::Number(value) => write!(f, "Number({value})"),
            Self::String(value) => write!(f, "String({value:?})"),
            Self::Array(_) => write!(f, "Array([{self}])"),
            Self::Object(object) => {
                let object = object.borrow();
                f.debug_tuple("Object")
                    .field(&object.keys().collect::<Vec<_>>())
                    .finish()
            }
            Self::Function(function) => write!(f, "Function({})", function.name),
            Self::Promise(promise) => write!(f, "Promise(#{})", promise.id()),
            Self::Error(error) => write!(f, "Error({error})"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_string_form(f, &mut Vec::new())
    }
}

impl Value {
    /// `open_arrays` holds the arrays currently being printed; an array that
    /// contains itself prints as the empty string at the point of the cycle.
    fn write_string_form(
        &self,
        f: &mut fmt::Formatter<'_>,
        open_arrays: &mut Vec<*const RefCell<Vec<Value>>>,
    ) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Number(value) => write_number(f, *value),
            Self::String(value) => f.write_str(value),
            Self::Array(values) => {
                let ptr = Rc::as_ptr(values);
                if open_arrays.contains(&ptr) {
                    return Ok(());
                }
                open_arrays.push(ptr);
                let values = values.borrow();
                for (index, value) in values.iter().enumerate() {
                    if index > 0 {
                        f.write_str(",")?;
                    }
                    if !matches!(value, Self::Undefined | Self::Null) {
                        value.write_string_form(f, open_arrays)?;
                    }
                }
                open_arrays.pop();
                Ok(())
            }
            Self::Object(_) => f.write_str("[object Object]"),
            Self::Function(function) => write!(f, "function {}() {{ [native code] }}", function.name),
            Self::Promise(_) => f.write_str("[object Promise]"),
            Self::Error(error) => write!(f, "{error}"),
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value.is_nan() {
        f.write_str("NaN")
    } else if value.is_infinite() {
        f.write_str(if value > 0.0 { "Infinity" } else { "-Infinity" })
    } else if value == 0.0 {
        f.write_str("0")
    } else if value.fract() == 0.0 && value.abs() < 1e21 {
        write!(f, "{value:.0}")
    } else {
        write!(f, "{value}")
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<PromiseView> for Value {
    fn from(value: PromiseView) -> Self {
        Self::Promise(value)
    }
}

pub struct FunctionValue {
    name: String,
    body: Box<NativeFn>,
    properties: Rc<RefCell<ObjectValue>>,
}

impl FunctionValue {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Functions are objects too: a function with a callable `then` is a
    /// thenable.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.properties.borrow_mut().set(key, value);
    }

    pub fn define_getter(&self, key: impl Into<String>, getter: Value) {
        self.properties.borrow_mut().define_getter(key, getter);
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Completion {
        (self.body)(this, args)
    }
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionValue").field("name", &self.name).finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Property {
    Data(Value),
    Accessor { getter: Value },
}

#[derive(Debug, Clone, Default)]
pub struct ObjectValue {
    entries: Vec<(String, Property)>,
}

impl ObjectValue {
    pub fn new(entries: Vec<(String, Value)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, value)| (key, Property::Data(value)))
                .collect(),
        }
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.insert(key.into(), Property::Data(value));
    }

    pub fn define_getter(&mut self, key: impl Into<String>, getter: Value) {
        self.insert(key.into(), Property::Accessor { getter });
    }

    pub fn property(&self, key: &str) -> Option<&Property> {
        self.entries
            .iter()
            .find_map(|(name, property)| (name == key).then_some(property))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }

    /// Reads `key` from `object`. The borrow is released before a getter runs
    /// so getters may freely touch the object themselves.
    pub fn get(object: &Rc<RefCell<ObjectValue>>, this: &Value, key: &str) -> Completion {
        let property = object.borrow().property(key).cloned();
        match property {
            None => Ok(Value::Undefined),
            Some(Property::Data(value)) => Ok(value),
            Some(Property::Accessor { getter }) => getter.call(this, &[]),
        }
    }

    fn insert(&mut self, key: String, property: Property) {
        if let Some(slot) = self.entries.iter_mut().find(|(name, _)| *name == key) {
            slot.1 = property;
        } else {
            self.entries.push((key, property));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for ErrorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(self.kind.name())
        } else {
            write!(f, "{}: {}", self.kind.name(), self.message)
        }
    }
}
