/// Single scripted evaluation: elementFromPoint + css path + xpath + text +
/// attributes + bounding box, all in one round trip. Coordinates are
/// substituted as locale-independent decimals to avoid parser ambiguity in
/// the target scripting environment.
const ELEMENT_FROM_POINT_TEMPLATE: &str = r#"(function() {
    var el = document.elementFromPoint(__X__, __Y__);
    if (!el) { return null; }

    function cssPath(node) {
        if (node.id) { return '#' + node.id; }
        var parts = [];
        while (node && node.nodeType === 1 && parts.length < 8) {
            var part = node.tagName.toLowerCase();
            if (node.parentElement) {
                var siblings = Array.prototype.filter.call(
                    node.parentElement.children,
                    function(sib) { return sib.tagName === node.tagName; }
                );
                if (siblings.length > 1) {
                    part += ':nth-child(' + (Array.prototype.indexOf.call(node.parentElement.children, node) + 1) + ')';
                }
            }
            parts.unshift(part);
            node = node.parentElement;
        }
        return parts.join(' > ');
    }

    function xPath(node) {
        var parts = [];
        while (node && node.nodeType === 1) {
            var index = 1;
            var sibling = node.previousElementSibling;
            while (sibling) {
                if (sibling.tagName === node.tagName) { index++; }
                sibling = sibling.previousElementSibling;
            }
            parts.unshift(node.tagName.toLowerCase() + '[' + index + ']');
            node = node.parentElement;
        }
        return '/' + parts.join('/');
    }

    var attributes = {};
    for (var i = 0; i < el.attributes.length; i++) {
        attributes[el.attributes[i].name] = el.attributes[i].value;
    }
    var rect = el.getBoundingClientRect();
    var text = (el.textContent || '').trim();
    if (text.length > 200) { text = text.substring(0, 200); }

    return {
        tagName: el.tagName.toLowerCase(),
        id: el.id || null,
        name: el.getAttribute('name'),
        className: el.className || null,
        css: cssPath(el),
        xpath: xPath(el),
        text: text,
        value: el.value != null ? String(el.value) : null,
        type: el.getAttribute('type'),
        attributes: attributes,
        boundingBox: { x: rect.x, y: rect.y, w: rect.width, h: rect.height }
    };
})()"#;

/// Single scripted evaluation: returns "__top__" for the top document or
/// the nearest frame identifier (id or name) otherwise.
const FRAME_DETECT_TEMPLATE: &str = r#"(function() {
    var el = document.elementFromPoint(__X__, __Y__);
    if (!el) { return '__top__'; }
    var frameElement = null;
    try { frameElement = window.frameElement; } catch (e) { frameElement = null; }
    if (!frameElement) { return '__top__'; }
    return frameElement.id || frameElement.name || '__top__';
})()"#;

fn format_coordinate(value: f64) -> String {
    format!("{value:.3}")
}

pub fn element_from_point_script(x: f64, y: f64) -> String {
    ELEMENT_FROM_POINT_TEMPLATE
        .replace("__X__", &format_coordinate(x))
        .replace("__Y__", &format_coordinate(y))
}

pub fn frame_detect_script(x: f64, y: f64) -> String {
    FRAME_DETECT_TEMPLATE
        .replace("__X__", &format_coordinate(x))
        .replace("__Y__", &format_coordinate(y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_from_point_script_substitutes_locale_independent_decimals() {
        let script = element_from_point_script(12.5, 7.0);
        assert!(script.contains("document.elementFromPoint(12.500, 7.000)"));
        assert!(!script.contains("__X__"));
        assert!(!script.contains("__Y__"));
    }

    #[test]
    fn frame_detect_script_substitutes_coordinates() {
        let script = frame_detect_script(1.0, 2.0);
        assert!(script.contains("document.elementFromPoint(1.000, 2.000)"));
    }
}
