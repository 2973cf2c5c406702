//! Attribute and property classification for the DOM back end.
//!
//! Given a namespace and a prop name as written in markup (`className`,
//! `htmlFor`, `strokeWidth`, `xlinkHref`, `aria-label`, ...), an
//! [`AttributeTable`] says which attribute to write, under which
//! namespace, and how the value must be applied: as a property, as a
//! boolean, or as a space- or comma-joined list.
//!
//! [`HtmlAttributes`] is the built-in table. Hosts can supply their own
//! through [`RenderOptions::attribute_table`](crate::RenderOptions::attribute_table).

use crate::dom::{Namespace, XLINK_NS, XML_NS, XMLNS_NS};

/// How a single prop maps onto an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Attribute name to write, e.g. `class` for `className`.
    pub attribute: String,
    /// Property name to assign when the value is applied as a property.
    pub property: String,
    pub attribute_namespace: Option<&'static str>,
    /// Present-or-absent attribute; any truthy value turns it on.
    pub boolean: bool,
    /// Must be assigned as a property, e.g. `checked` or `muted`.
    pub must_use_property: bool,
    /// `true` sets an empty attribute, `false` removes it, anything else
    /// is written as text (e.g. `download`).
    pub overloaded_boolean: bool,
    pub space_separated: bool,
    pub comma_separated: bool,
}

impl PropertyInfo {
    /// A plain attribute written verbatim.
    pub fn plain(attribute: impl Into<String>, property: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            property: property.into(),
            attribute_namespace: None,
            boolean: false,
            must_use_property: false,
            overloaded_boolean: false,
            space_separated: false,
            comma_separated: false,
        }
    }
}

/// Lookup from `(namespace, prop name)` to a [`PropertyInfo`].
pub trait AttributeTable {
    fn lookup(&self, namespace: Namespace, name: &str) -> PropertyInfo;
}

/// The built-in HTML, SVG and MathML table.
///
/// ```rust
/// use markup_lit::{AttributeTable, HtmlAttributes, Namespace};
///
/// let info = HtmlAttributes.lookup(Namespace::Svg, "strokeWidth");
/// assert_eq!(info.attribute, "stroke-width");
///
/// let info = HtmlAttributes.lookup(Namespace::Html, "readOnly");
/// assert_eq!(info.attribute, "readonly");
/// assert!(info.boolean);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlAttributes;

impl AttributeTable for HtmlAttributes {
    fn lookup(&self, namespace: Namespace, name: &str) -> PropertyInfo {
        if let Some(info) = lookup_xml(name) {
            return info;
        }
        match namespace {
            Namespace::Html => lookup_html(name),
            Namespace::Svg => lookup_svg(name),
            Namespace::MathMl => lookup_mathml(name),
        }
    }
}

// ── HTML ────────────────────────────────────────────────────────────────

const BOOLEAN: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "disablepictureinpicture",
    "disableremoteplayback",
    "formnovalidate",
    "hidden",
    "inert",
    "ismap",
    "itemscope",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "playsinline",
    "readonly",
    "required",
    "reversed",
    "scoped",
    "seamless",
    "selected",
];

const MUST_USE_PROPERTY: &[&str] = &["checked", "multiple", "muted", "selected"];

const OVERLOADED_BOOLEAN: &[&str] = &["capture", "download"];

const SPACE_SEPARATED: &[&str] = &[
    "accesskey",
    "blocking",
    "class",
    "for",
    "headers",
    "itemprop",
    "itemref",
    "itemtype",
    "ping",
    "rel",
    "sandbox",
];

const COMMA_SEPARATED: &[&str] = &["accept", "coords", "imagesizes", "imagesrcset", "sizes", "srcset"];

/// camelCase property names whose attribute is the all-lowercase form.
const CAMEL_PROPERTIES: &[&str] = &[
    "accessKey",
    "allowFullScreen",
    "autoCapitalize",
    "autoComplete",
    "autoFocus",
    "autoPlay",
    "cellPadding",
    "cellSpacing",
    "colSpan",
    "contentEditable",
    "crossOrigin",
    "dateTime",
    "encType",
    "enterKeyHint",
    "fetchPriority",
    "formAction",
    "formEncType",
    "formMethod",
    "formNoValidate",
    "formTarget",
    "frameBorder",
    "hrefLang",
    "imageSizes",
    "imageSrcSet",
    "inputMode",
    "isMap",
    "itemId",
    "itemProp",
    "itemRef",
    "itemScope",
    "itemType",
    "marginHeight",
    "marginWidth",
    "maxLength",
    "mediaGroup",
    "minLength",
    "noModule",
    "noValidate",
    "playsInline",
    "readOnly",
    "referrerPolicy",
    "rowSpan",
    "spellCheck",
    "srcDoc",
    "srcLang",
    "srcSet",
    "tabIndex",
    "useMap",
];

fn lookup_html(name: &str) -> PropertyInfo {
    let (attribute, property) = match name {
        "className" | "class" => ("class".to_string(), "className".to_string()),
        "htmlFor" | "for" => ("for".to_string(), "htmlFor".to_string()),
        "httpEquiv" | "http-equiv" => ("http-equiv".to_string(), "httpEquiv".to_string()),
        "acceptCharset" | "accept-charset" => ("accept-charset".to_string(), "acceptCharset".to_string()),
        _ if name.contains('-') || name.contains(':') => (name.to_string(), name.to_string()),
        _ => {
            let property = CAMEL_PROPERTIES
                .iter()
                .find(|p| p.eq_ignore_ascii_case(name))
                .map_or(name, |p| p);
            (name.to_ascii_lowercase(), property.to_string())
        }
    };

    let key = attribute.as_str();
    PropertyInfo {
        boolean: BOOLEAN.contains(&key),
        must_use_property: MUST_USE_PROPERTY.contains(&key),
        overloaded_boolean: OVERLOADED_BOOLEAN.contains(&key),
        space_separated: SPACE_SEPARATED.contains(&key),
        comma_separated: COMMA_SEPARATED.contains(&key),
        ..PropertyInfo::plain(attribute.clone(), property)
    }
}

// ── SVG ─────────────────────────────────────────────────────────────────

/// SVG attributes that are camelCase in the attribute itself.
const SVG_CASE_SENSITIVE: &[&str] = &[
    "allowReorder",
    "attributeName",
    "attributeType",
    "autoReverse",
    "baseFrequency",
    "baseProfile",
    "calcMode",
    "clipPathUnits",
    "contentScriptType",
    "contentStyleType",
    "diffuseConstant",
    "edgeMode",
    "externalResourcesRequired",
    "filterRes",
    "filterUnits",
    "glyphRef",
    "gradientTransform",
    "gradientUnits",
    "kernelMatrix",
    "kernelUnitLength",
    "keyPoints",
    "keySplines",
    "keyTimes",
    "lengthAdjust",
    "limitingConeAngle",
    "markerHeight",
    "markerUnits",
    "markerWidth",
    "maskContentUnits",
    "maskUnits",
    "numOctaves",
    "pathLength",
    "patternContentUnits",
    "patternTransform",
    "patternUnits",
    "pointsAtX",
    "pointsAtY",
    "pointsAtZ",
    "preserveAlpha",
    "preserveAspectRatio",
    "primitiveUnits",
    "refX",
    "refY",
    "repeatCount",
    "repeatDur",
    "requiredExtensions",
    "requiredFeatures",
    "specularConstant",
    "specularExponent",
    "spreadMethod",
    "startOffset",
    "stdDeviation",
    "stitchTiles",
    "surfaceScale",
    "systemLanguage",
    "tableValues",
    "targetX",
    "targetY",
    "textLength",
    "viewBox",
    "viewTarget",
    "xChannelSelector",
    "yChannelSelector",
    "zoomAndPan",
];

fn lookup_svg(name: &str) -> PropertyInfo {
    match name {
        "className" | "class" => PropertyInfo {
            space_separated: true,
            ..PropertyInfo::plain("class", "className")
        },
        _ if name.contains('-') || name.contains(':') || SVG_CASE_SENSITIVE.contains(&name) => {
            PropertyInfo::plain(name, name)
        }
        _ => PropertyInfo::plain(kebab_case(name), name),
    }
}

// ── MathML ──────────────────────────────────────────────────────────────

fn lookup_mathml(name: &str) -> PropertyInfo {
    match name {
        "className" | "class" => PropertyInfo {
            space_separated: true,
            ..PropertyInfo::plain("class", "className")
        },
        _ => PropertyInfo::plain(name, name),
    }
}

// ── XML-namespaced attributes ───────────────────────────────────────────

fn lookup_xml(name: &str) -> Option<PropertyInfo> {
    let (attribute, namespace) = if let Some(local) = name.strip_prefix("xlink:") {
        (format!("xlink:{local}"), XLINK_NS)
    } else if let Some(local) = camel_suffix(name, "xlink") {
        (format!("xlink:{}", local.to_ascii_lowercase()), XLINK_NS)
    } else if name == "xmlns" {
        ("xmlns".to_string(), XMLNS_NS)
    } else if let Some(local) = name.strip_prefix("xmlns:") {
        (format!("xmlns:{local}"), XMLNS_NS)
    } else if let Some(local) = camel_suffix(name, "xmlns") {
        (format!("xmlns:{}", local.to_ascii_lowercase()), XMLNS_NS)
    } else if let Some(local) = name.strip_prefix("xml:") {
        (format!("xml:{local}"), XML_NS)
    } else if let Some(local) = camel_suffix(name, "xml") {
        (format!("xml:{}", local.to_ascii_lowercase()), XML_NS)
    } else {
        return None;
    };

    Some(PropertyInfo {
        attribute_namespace: Some(namespace),
        ..PropertyInfo::plain(attribute, name)
    })
}

/// `xlinkHref` with prefix `xlink` yields `Href`.
fn camel_suffix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    name.strip_prefix(prefix)
        .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
}

fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
