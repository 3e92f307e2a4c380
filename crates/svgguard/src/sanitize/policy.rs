//! Allow-list configuration for [`PolicySanitizer`](super::PolicySanitizer)

use std::collections::HashSet;

const SVG_ELEMENTS: &[&str] = &[
    "a",
    "animateTransform",
    "circle",
    "clipPath",
    "defs",
    "desc",
    "ellipse",
    "feBlend",
    "feColorMatrix",
    "feComponentTransfer",
    "feComposite",
    "feConvolveMatrix",
    "feDiffuseLighting",
    "feDisplacementMap",
    "feDistantLight",
    "feDropShadow",
    "feFlood",
    "feFuncA",
    "feFuncB",
    "feFuncG",
    "feFuncR",
    "feGaussianBlur",
    "feMerge",
    "feMergeNode",
    "feMorphology",
    "feOffset",
    "fePointLight",
    "feSpecularLighting",
    "feSpotLight",
    "feTile",
    "feTurbulence",
    "filter",
    "g",
    "image",
    "line",
    "linearGradient",
    "marker",
    "mask",
    "metadata",
    "path",
    "pattern",
    "polygon",
    "polyline",
    "radialGradient",
    "rect",
    "stop",
    "svg",
    "switch",
    "symbol",
    "text",
    "textPath",
    "title",
    "tspan",
    "use",
    "view",
];

const SVG_ATTRIBUTES: &[&str] = &[
    "accumulate",
    "additive",
    "alignment-baseline",
    "amplitude",
    "aria-hidden",
    "aria-label",
    "aria-labelledby",
    "attributeName",
    "attributeType",
    "azimuth",
    "baseFrequency",
    "baseProfile",
    "baseline-shift",
    "begin",
    "bias",
    "by",
    "calcMode",
    "class",
    "clip-path",
    "clip-rule",
    "clipPathUnits",
    "color",
    "color-interpolation",
    "color-interpolation-filters",
    "cx",
    "cy",
    "d",
    "diffuseConstant",
    "direction",
    "display",
    "divisor",
    "dominant-baseline",
    "dur",
    "dx",
    "dy",
    "edgeMode",
    "elevation",
    "end",
    "exponent",
    "fill",
    "fill-opacity",
    "fill-rule",
    "filter",
    "filterUnits",
    "flood-color",
    "flood-opacity",
    "focusable",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "fr",
    "from",
    "fx",
    "fy",
    "gradientTransform",
    "gradientUnits",
    "height",
    "href",
    "id",
    "image-rendering",
    "in",
    "in2",
    "intercept",
    "k1",
    "k2",
    "k3",
    "k4",
    "kernelMatrix",
    "kernelUnitLength",
    "keySplines",
    "keyTimes",
    "lang",
    "lengthAdjust",
    "letter-spacing",
    "lighting-color",
    "limitingConeAngle",
    "marker-end",
    "marker-mid",
    "marker-start",
    "markerHeight",
    "markerUnits",
    "markerWidth",
    "mask",
    "maskContentUnits",
    "maskUnits",
    "mode",
    "numOctaves",
    "offset",
    "opacity",
    "operator",
    "order",
    "orient",
    "overflow",
    "paint-order",
    "pathLength",
    "patternContentUnits",
    "patternTransform",
    "patternUnits",
    "points",
    "pointsAtX",
    "pointsAtY",
    "pointsAtZ",
    "preserveAlpha",
    "preserveAspectRatio",
    "primitiveUnits",
    "r",
    "radius",
    "refX",
    "refY",
    "repeatCount",
    "repeatDur",
    "result",
    "role",
    "rotate",
    "rx",
    "ry",
    "scale",
    "seed",
    "shape-rendering",
    "slope",
    "specularConstant",
    "specularExponent",
    "spreadMethod",
    "startOffset",
    "stdDeviation",
    "stitchTiles",
    "stop-color",
    "stop-opacity",
    "stroke",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "style",
    "surfaceScale",
    "tableValues",
    "targetX",
    "targetY",
    "text-anchor",
    "text-decoration",
    "text-rendering",
    "textLength",
    "to",
    "transform",
    "type",
    "values",
    "vector-effect",
    "version",
    "viewBox",
    "visibility",
    "width",
    "word-spacing",
    "writing-mode",
    "x",
    "x1",
    "x2",
    "xChannelSelector",
    "y",
    "y1",
    "y2",
    "yChannelSelector",
];

const CSS_PROPERTIES: &[&str] = &[
    "clip-path",
    "clip-rule",
    "color",
    "color-interpolation-filters",
    "display",
    "fill",
    "fill-opacity",
    "fill-rule",
    "filter",
    "flood-color",
    "flood-opacity",
    "font",
    "font-family",
    "font-size",
    "font-style",
    "font-variant",
    "font-weight",
    "isolation",
    "letter-spacing",
    "lighting-color",
    "marker",
    "marker-end",
    "marker-mid",
    "marker-start",
    "mask",
    "mix-blend-mode",
    "opacity",
    "overflow",
    "paint-order",
    "shape-rendering",
    "stop-color",
    "stop-opacity",
    "stroke",
    "stroke-dasharray",
    "stroke-dashoffset",
    "stroke-linecap",
    "stroke-linejoin",
    "stroke-miterlimit",
    "stroke-opacity",
    "stroke-width",
    "text-anchor",
    "text-decoration",
    "vector-effect",
    "visibility",
    "word-spacing",
];

const URI_ATTRIBUTES: &[&str] = &["href"];

/// Allow-list rules applied by the policy sanitizer
///
/// Element and attribute names are matched case-sensitively against the
/// local (namespace-free) name. CSS property names are matched in ASCII
/// lowercase.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Policy {
    elements: HashSet<String>,
    attributes: HashSet<String>,
    css_properties: HashSet<String>,
    uri_attributes: HashSet<String>,
    allow_comments: bool,
    keep_declaration: bool,
}

impl Policy {
    /// Built-in allow-list for static SVG images
    pub fn svg() -> Self {
        Self::builder()
            .elements(SVG_ELEMENTS.iter().copied())
            .attributes(SVG_ATTRIBUTES.iter().copied())
            .css_properties(CSS_PROPERTIES.iter().copied())
            .uri_attributes(URI_ATTRIBUTES.iter().copied())
            .build()
    }

    /// Start from an empty policy that allows nothing
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    pub fn allows_element(&self, name: &str) -> bool {
        self.elements.contains(name)
    }

    pub fn allows_attribute(&self, name: &str) -> bool {
        self.attributes.contains(name)
    }

    pub fn allows_css_property(&self, name: &str) -> bool {
        self.css_properties.contains(&name.to_ascii_lowercase())
    }

    pub fn is_uri_attribute(&self, name: &str) -> bool {
        self.uri_attributes.contains(name)
    }

    pub const fn allows_comments(&self) -> bool {
        self.allow_comments
    }

    pub const fn keeps_declaration(&self) -> bool {
        self.keep_declaration
    }
}

/// Builder for [`Policy`]
#[derive(Clone, Debug, Default)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn elements<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.elements.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy
            .attributes
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn css_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy.css_properties.extend(
            names
                .into_iter()
                .map(|name| name.into().to_ascii_lowercase()),
        );
        self
    }

    pub fn uri_attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.policy
            .uri_attributes
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub const fn allow_comments(mut self, allow: bool) -> Self {
        self.policy.allow_comments = allow;
        self
    }

    pub const fn keep_declaration(mut self, keep: bool) -> Self {
        self.policy.keep_declaration = keep;
        self
    }

    pub fn build(self) -> Policy {
        self.policy
    }
}
