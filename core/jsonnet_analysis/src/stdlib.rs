//! The standard-library catalogue.
//!
//! A static table of `std` entries: name, documentation, and a signature
//! written in the annotation language. The signatures are parsed once at
//! startup into a single `Value` whose object is referentially unique, so
//! callers can identity-compare against it to take the stdlib fast paths
//! (completion lists, dotted access).
//!
//! This is data, not logic; the deducer and linter consume it like any
//! other object value.

use std::sync::Arc;

use once_cell::sync::Lazy;
use tracing::error;

use crate::annotation;
use crate::typehint::{annotation_to_type_info, TypeInfo};
use crate::value::{Field, Object, Value};

struct BuiltinEntry {
    name: &'static str,
    doc: &'static str,
    /// Signature in annotation syntax; `None` marks a plain string field.
    signature: Option<&'static str>,
    /// Parameters that may be omitted in calls.
    optional: &'static [&'static str],
}

macro_rules! entry {
    ($name:literal, $sig:literal, $doc:literal) => {
        BuiltinEntry {
            name: $name,
            doc: $doc,
            signature: Some($sig),
            optional: &[],
        }
    };
    ($name:literal, $sig:literal, $doc:literal, opt: $opt:expr) => {
        BuiltinEntry {
            name: $name,
            doc: $doc,
            signature: Some($sig),
            optional: $opt,
        }
    };
}

#[rustfmt::skip]
static BUILTIN_FUNCTIONS: &[BuiltinEntry] = &[
    BuiltinEntry {
        name: "thisFile",
        doc: "This is a field. It contains the current Jsonnet filename as a string.",
        signature: None,
        optional: &[],
    },
    entry!("extVar", "function(x: string) -> string",
        "If an external variable with the given name was defined, return its string value. Otherwise, raise an error."),
    entry!("type", "function(x: any) -> string",
        "Return a string that indicates the type of the value. The possible return values are: \"array\", \"boolean\", \"function\", \"null\", \"number\", \"object\", and \"string\"."),
    entry!("length", "function(x: array | object | string | function) -> number",
        "Depending on the type of the value given, either returns the number of elements in the array, the number of codepoints in the string, the number of parameters in the function, or the number of fields in the object. Raises an error if given a primitive value, i.e. null, true or false."),
    entry!("get", "function(o: object, f: string, default: any, inc_hidden: boolean) -> any",
        "Returns the object's field if it exists or default value otherwise. inc_hidden controls whether to include hidden fields.",
        opt: &["default", "inc_hidden"]),
    entry!("objectHas", "function(o: object, f: string) -> boolean",
        "Returns true if the given object has the field (given as a string), otherwise false. Raises an error if the arguments are not object and string respectively. Returns false if the field is hidden."),
    entry!("objectFields", "function(o: object) -> array[string]",
        "Returns an array of strings, each element being a field from the given object. Does not include hidden fields."),
    entry!("objectValues", "function(o: object) -> array[any]",
        "Returns an array of the values in the given object. Does not include hidden fields."),
    entry!("objectKeysValues", "function(o: object) -> array[{key: string, value: any}]",
        "Returns an array of objects from the given object, each object having two fields: key (string) and value (object). Does not include hidden fields."),
    entry!("objectHasAll", "function(o: object, f: string) -> boolean",
        "As std.objectHas but also includes hidden fields."),
    entry!("objectFieldsAll", "function(o: object) -> array[string]",
        "As std.objectFields but also includes hidden fields."),
    entry!("objectValuesAll", "function(o: object) -> array[any]",
        "As std.objectValues but also includes hidden fields."),
    entry!("objectKeysValuesAll", "function(o: object) -> array[{key: string, value: any}]",
        "As std.objectKeysValues but also includes hidden fields."),
    entry!("prune", "function(a: any) -> any",
        "Recursively remove all \"empty\" members of a. \"Empty\" is defined as zero length arrays, zero length objects, or null values."),
    entry!("mapWithKey", "function(func: function(field: string, value: any) -> any, obj: object) -> object",
        "Apply the given function to all fields of the given object, also passing the field name. The function func is expected to take the field name as the first parameter and the field value as the second."),
    entry!("abs", "function(n: number) -> number", "Return the absolute value of the argument."),
    entry!("sign", "function(n: number) -> number", "Returns the sign of the number."),
    entry!("max", "function(a: number, b: number) -> number", "Returns the maximum of a and b."),
    entry!("min", "function(a: number, b: number) -> number", "Returns the minimum of a and b."),
    entry!("pow", "function(x: number, n: number) -> number", "Returns x raised to the power of n."),
    entry!("exp", "function(x: number) -> number", "Returns the natural exponential function of x."),
    entry!("log", "function(x: number) -> number", "Returns the natural logarithm (base e) of x."),
    entry!("exponent", "function(x: number) -> number", "Returns the exponent of x as per the IEEE 754 standard."),
    entry!("mantissa", "function(x: number) -> number", "Returns the mantissa of x as per the IEEE 754 standard."),
    entry!("floor", "function(x: number) -> number", "Returns the greatest integer less than or equal to x."),
    entry!("ceil", "function(x: number) -> number", "Returns the smallest integer greater than or equal to x."),
    entry!("sqrt", "function(x: number) -> number", "Returns the square root of x."),
    entry!("sin", "function(x: number) -> number", "Returns the sine of x, where x is in radians."),
    entry!("cos", "function(x: number) -> number", "Returns the cosine of x, where x is in radians."),
    entry!("tan", "function(x: number) -> number", "Returns the tangent of x, where x is in radians."),
    entry!("asin", "function(x: number) -> number", "Returns the arcsine (inverse sine) of x."),
    entry!("acos", "function(x: number) -> number", "Returns the arccosine (inverse cosine) of x."),
    entry!("atan", "function(x: number) -> number", "Returns the arctangent (inverse tangent) of x."),
    entry!("round", "function(x: number) -> number", "Returns the value of x rounded to the nearest integer."),
    entry!("mod", "function(a: number | string, b: any) -> number | string",
        "Performs modulo arithmetic if the left hand side is a number, or if the left hand side is a string, it does Python-style string formatting with std.format()."),
    entry!("clamp", "function(x: number, minVal: number, maxVal: number) -> number",
        "Clamp a value to fit within the range [minVal, maxVal]. Equivalent to std.max(minVal, std.min(x, maxVal))."),
    entry!("assertEqual", "function(a: any, b: any) -> boolean",
        "Ensure that a == b. Returns true or throws an error message."),
    entry!("toString", "function(a: any) -> string", "Convert the given argument to a string."),
    entry!("codepoint", "function(str: string) -> number",
        "Returns the positive integer representing the unicode codepoint of the character in the given single-character string."),
    entry!("char", "function(n: number) -> string",
        "Returns a string of length one whose only unicode codepoint has integer id n."),
    entry!("substr", "function(str: string, from: number, len: number) -> string",
        "Returns a string that is the part of str that starts at offset from and is len codepoints long."),
    entry!("findSubstr", "function(pat: string, str: string) -> array[number]",
        "Returns an array that contains the indexes of all occurrences of pat in str."),
    entry!("startsWith", "function(a: string, b: string) -> boolean",
        "Returns whether the string a is prefixed by the string b."),
    entry!("endsWith", "function(a: string, b: string) -> boolean",
        "Returns whether the string a is suffixed by the string b."),
    entry!("stripChars", "function(str: string, chars: string) -> string",
        "Removes characters chars from the beginning and from the end of str."),
    entry!("lstripChars", "function(str: string, chars: string) -> string",
        "Removes characters chars from the beginning of str."),
    entry!("rstripChars", "function(str: string, chars: string) -> string",
        "Removes characters chars from the end of str."),
    entry!("split", "function(str: string, c: string) -> array[string]",
        "Split the string str into an array of strings, divided by the string c."),
    entry!("splitLimit", "function(str: string, c: string, maxsplits: number) -> array[string]",
        "As std.split(str, c) but will stop after maxsplits splits, thereby the largest array it will return has length maxsplits + 1."),
    entry!("splitLimitR", "function(str: string, c: string, maxsplits: number) -> array[string]",
        "As std.splitLimit(str, c, maxsplits) but will split from right to left."),
    entry!("strReplace", "function(str: string, from: string, to: string) -> string",
        "Returns a copy of the string in which all occurrences of string from have been replaced with string to."),
    entry!("isEmpty", "function(str: string) -> boolean",
        "Returns true if the the given string is of zero length."),
    entry!("asciiUpper", "function(str: string) -> string",
        "Returns a copy of the string in which all ASCII letters are capitalized."),
    entry!("asciiLower", "function(str: string) -> string",
        "Returns a copy of the string in which all ASCII letters are lower cased."),
    entry!("stringChars", "function(str: string) -> array[string]",
        "Split the string str into an array of strings, each containing a single codepoint."),
    entry!("format", "function(str: string, vals: any) -> string",
        "Format the string str using the values in vals. The values can be an array, an object, or in other cases are treated as if they were provided in a singleton array."),
    entry!("escapeStringBash", "function(str: string) -> string",
        "Wrap str in single quotes, and escape any single quotes within str by changing them to a sequence of ' \" ' \" '."),
    entry!("escapeStringDollars", "function(str: string) -> string",
        "Convert $ to $$ in str. This allows injection of arbitrary strings into systems that use $ for string interpolation (like Terraform)."),
    entry!("escapeStringJson", "function(str: string) -> string",
        "Convert str to allow it to be embedded in a JSON representation, within a string. This adds quotes, escapes backslashes, and escapes unprintable characters."),
    entry!("escapeStringPython", "function(str: string) -> string",
        "Convert str to allow it to be embedded in Python. This is an alias for std.escapeStringJson."),
    entry!("escapeStringXml", "function(str: string) -> string",
        "Convert str to allow it to be embedded in XML (or HTML)."),
    entry!("parseInt", "function(str: string) -> number",
        "Parses a signed decimal integer from the input string."),
    entry!("parseOctal", "function(str: string) -> number",
        "Parses an unsigned octal integer from the input string. Initial zeroes are tolerated."),
    entry!("parseHex", "function(str: string) -> number",
        "Parses an unsigned hexadecimal integer, from the input string. Case insensitive."),
    entry!("parseJson", "function(str: string) -> any", "Parses a JSON string."),
    entry!("parseYaml", "function(str: string) -> any",
        "Parses a YAML string. This is provided as a 'best-effort' mechanism and should not be relied on to provide a fully standards compliant YAML parser."),
    entry!("encodeUTF8", "function(str: string) -> array[number]",
        "Encode a string using UTF8. Returns an array of numbers representing bytes."),
    entry!("decodeUTF8", "function(arr: array[number]) -> string",
        "Decode an array of numbers representing bytes using UTF8. Returns a string."),
    entry!("manifestIni", "function(ini: any) -> string",
        "Convert the given structure to a string in INI format."),
    entry!("manifestPython", "function(v: any) -> string",
        "Convert the given value to a JSON-like form that is compatible with Python."),
    entry!("manifestPythonVars", "function(conf: any) -> string",
        "Convert the given object to a JSON-like form that is compatible with Python. The top level is represented as a list of Python global variables."),
    entry!("manifestJsonEx", "function(value: any, indent: string, newline: string, key_val_sep: string) -> string",
        "Convert the given object to a JSON form.",
        opt: &["newline", "key_val_sep"]),
    entry!("manifestJsonMinified", "function(value: any) -> string",
        "Convert the given object to a minified JSON form."),
    entry!("manifestYamlDoc", "function(value: any, indent_array_in_object: boolean, quote_keys: boolean) -> string",
        "Convert the given value to a YAML form.",
        opt: &["indent_array_in_object", "quote_keys"]),
    entry!("manifestYamlStream", "function(value: any, indent_array_in_object: boolean, c_document_end: boolean, quote_keys: boolean) -> string",
        "Given an array of values, emit a YAML 'stream', which is a sequence of documents separated by --- and ending with ....",
        opt: &["indent_array_in_object", "c_document_end", "quote_keys"]),
    entry!("manifestXmlJsonml", "function(value: any) -> string",
        "Convert the given JsonML-encoded value to a string containing the XML."),
    entry!("manifestTomlEx", "function(toml: any, indent: string) -> string",
        "Convert the given object to a TOML form."),
    entry!("makeArray", "function(sz: number, func: function(i: number) -> E) -> array[E]",
        "Create a new array of sz elements by calling func(i) to initialize each element. func is expected to be a function that takes a single parameter, the index of the element it should initialize."),
    entry!("member", "function(arr: array[E], x: E) -> boolean",
        "Returns whether x occurs in arr. Argument arr may be an array or a string."),
    entry!("count", "function(arr: array[E], x: E) -> number",
        "Return the number of times that x occurs in arr."),
    entry!("find", "function(value: E, arr: array[E]) -> array[number]",
        "Returns an array that contains the indexes of all occurrences of value in arr."),
    entry!("map", "function(func: function(elem: E) -> F, arr: array[E]) -> array[F]",
        "Apply the given function to every element of the array to form a new array."),
    entry!("mapWithIndex", "function(func: function(i: number, elem: E) -> F, arr: array[E]) -> array[F]",
        "Similar to map above, but it also passes to the function the element's index in the array. The function func is expected to take the index as the first parameter and the element as the second."),
    entry!("filterMap", "function(filter_func: function(elem: E) -> boolean, map_func: function(elem: E) -> F, arr: array[E]) -> array[F]",
        "It first filters, then maps the given array, using the two functions provided."),
    entry!("flatMap", "function(func: function(elem: E) -> array[F], arr: array[E]) -> array[F]",
        "Apply the given function to every element of arr to form a new array then flatten the result. If arr is an array, function func must return an array. If arr is a string, function func must return a string."),
    entry!("filter", "function(func: function(elem: E) -> boolean, arr: array[E]) -> array[E]",
        "Return a new array containing all the elements of arr for which the func function returns true."),
    entry!("foldl", "function(func: function(acc: A, elem: E) -> A, arr: array[E], init: A) -> A",
        "Classic foldl function. Calls the function on the result of the previous function call and each array element, or init in the case of the initial element. Traverses the array from left to right."),
    entry!("foldr", "function(func: function(acc: A, elem: E) -> A, arr: array[E], init: A) -> A",
        "Classic foldr function. Calls the function on the result of the previous function call and each array element, or init in the case of the initial element. Traverses the array from right to left."),
    entry!("range", "function(from: number, to: number) -> array[number]",
        "Return an array of ascending numbers between the two limits, inclusively."),
    entry!("repeat", "function(what: array[E], count: number) -> array[E]",
        "Repeats an array or a string what a number of times specified by an integer count."),
    entry!("slice", "function(indexable: array[E], index: number, end: number, step: number) -> array[E]",
        "Selects the elements of an array or a string from index to end with step and returns an array or a string respectively."),
    entry!("join", "function(sep: string | array, arr: array) -> string | array",
        "If sep is a string, then arr must be an array of strings, in which case they are concatenated with sep used as a delimiter. If sep is an array, then arr must be an array of arrays, in which case the arrays are concatenated in the same way, to produce a single array."),
    entry!("lines", "function(arr: array[string]) -> string",
        "Concatenate an array of strings into a text file with newline characters after each string. This is suitable for constructing bash scripts and the like."),
    entry!("flattenArrays", "function(arr: array[array[E]]) -> array[E]",
        "Concatenate an array of arrays into a single array."),
    entry!("reverse", "function(arr: array[E]) -> array[E]", "Reverses an array."),
    entry!("sort", "function(arr: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Sorts the array using the <= operator. Optional argument keyF is a single argument function used to extract comparison key from each array element.",
        opt: &["keyF"]),
    entry!("uniq", "function(arr: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Removes successive duplicates. When given a sorted array, removes all duplicates. Optional argument keyF is a single argument function used to extract comparison key from each array element.",
        opt: &["keyF"]),
    entry!("all", "function(arr: array[boolean]) -> boolean",
        "Return true if all elements of arr is true, false otherwise. all([]) evaluates to true. It's an error if 1) arr is not an array, or 2) arr contains non-boolean values."),
    entry!("any", "function(arr: array[boolean]) -> boolean",
        "Return true if any element of arr is true, false otherwise. any([]) evaluates to false. It's an error if 1) arr is not an array, or 2) arr contains non-boolean values."),
    entry!("sum", "function(arr: array[number]) -> number", "Return sum of all element in arr."),
    entry!("set", "function(arr: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Shortcut for std.uniq(std.sort(arr)).",
        opt: &["keyF"]),
    entry!("setInter", "function(a: array[E], b: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Set intersection operation (values in both a and b).",
        opt: &["keyF"]),
    entry!("setUnion", "function(a: array[E], b: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Set union operation (values in any of a or b).",
        opt: &["keyF"]),
    entry!("setDiff", "function(a: array[E], b: array[E], keyF: function(x: E) -> K) -> array[E]",
        "Set difference operation (values in a but not b).",
        opt: &["keyF"]),
    entry!("setMember", "function(x: E, arr: array[E], keyF: function(x: E) -> K) -> boolean",
        "Returns true if x is a member of array, otherwise false.",
        opt: &["keyF"]),
    entry!("base64", "function(input: string) -> string",
        "Encodes the given value into a base64 string."),
    entry!("base64DecodeBytes", "function(str: string) -> array[number]",
        "Decodes the given base64 string into an array of bytes."),
    entry!("base64Decode", "function(str: string) -> string",
        "Deprecated, use std.base64DecodeBytes and decode the string explicitly instead. Behaves like std.base64DecodeBytes() except returns a naively encoded string instead of an array of bytes."),
    entry!("md5", "function(s: string) -> string", "Encodes the given value into an MD5 string."),
    entry!("xor", "function(x: boolean, y: boolean) -> boolean",
        "Returns the xor of the two given booleans."),
    entry!("xnor", "function(x: boolean, y: boolean) -> boolean",
        "Returns the xnor of the two given booleans."),
    entry!("trace", "function(str: string, rest: any) -> any",
        "Outputs the given string str to stderr and returns rest as the result."),
];

static STDLIB_VALUE: Lazy<Value> = Lazy::new(build_stdlib);

/// The catalogue as a `Value`. Referentially unique: compare object
/// identity against it to detect `std`.
pub fn stdlib_value() -> &'static Value {
    &STDLIB_VALUE
}

/// A catalogue member as a standalone value, for dotted access.
pub fn stdlib_field_value(name: &str) -> Option<Value> {
    let object = STDLIB_VALUE.object()?;
    let field = object.get_field(name)?;
    Some(Value {
        ty: field.ty.clone(),
        comment: field.comment.clone(),
        ..Value::default()
    })
}

fn build_stdlib() -> Value {
    let mut object = Object {
        all_fields_known: true,
        ..Object::default()
    };

    for entry in BUILTIN_FUNCTIONS {
        let ty = match entry.signature {
            Some(signature) => match builtin_type(signature, entry) {
                Some(ty) => ty,
                None => continue,
            },
            None => TypeInfo::String,
        };
        object.push_field(Field {
            name: entry.name.to_string(),
            type_hint: Some(ty.clone()),
            ty,
            comment: vec![entry.doc.to_string()],
            ..Field::default()
        });
    }

    Value {
        ty: TypeInfo::Object {
            element: None,
            object: Some(Arc::new(object)),
        },
        comment: vec!["The built-in jsonnet standard library".to_string()],
        ..Value::default()
    }
}

fn builtin_type(signature: &str, entry: &BuiltinEntry) -> Option<TypeInfo> {
    let node = match annotation::parse(signature) {
        Ok(node) => node,
        Err(err) => {
            debug_assert!(false, "stdlib {}: bad signature: {err}", entry.name);
            error!(name = entry.name, %err, "stdlib entry has an invalid signature");
            return None;
        }
    };
    let info = match annotation_to_type_info(None, &node, None, 0) {
        Ok(info) => info,
        Err(err) => {
            debug_assert!(false, "stdlib {}: bad signature: {err}", entry.name);
            error!(name = entry.name, %err, "stdlib entry failed to resolve");
            return None;
        }
    };

    let TypeInfo::Function(Some(func)) = info else {
        debug_assert!(false, "stdlib {}: signature is not a function", entry.name);
        return None;
    };
    let mut func = (*func).clone();
    func.comment = vec![entry.doc.to_string()];
    for param in &mut func.params {
        if entry.optional.contains(&param.name.as_str()) {
            param.has_default = true;
        }
    }
    Some(TypeInfo::Function(Some(Arc::new(func))))
}
