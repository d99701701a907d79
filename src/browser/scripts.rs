/// Name of the CDP binding the page runtime pushes events through
pub const CAPTURE_BINDING: &str = "__playscribeCapture";

/// In-page runtime: element handle registry, descriptor extraction,
/// selector resolution and event capture.
///
/// Injected on every new document so it survives navigations. Events are
/// pushed through the CDP binding as they happen; there is no polling.
pub const PAGE_RUNTIME: &str = r#"
(() => {
    if (window.__playscribe) return true;

    // Handles are documentToken * DOCUMENT_SCOPE + index, below 2^53
    const DOCUMENT_SCOPE = 4294967296;
    const documentToken = 1 + Math.floor(Math.random() * 0xfffff);
    const handles = new Map();
    const ids = new WeakMap();
    let nextId = 1;

    const register = (el) => {
        if (!el) return null;
        let id = ids.get(el);
        if (id === undefined) {
            id = documentToken * DOCUMENT_SCOPE + nextId++;
            ids.set(el, id);
            handles.set(id, el);
        }
        return id;
    };

    const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();

    const isVisible = (el) => {
        const rect = el.getBoundingClientRect();
        if (rect.width === 0 || rect.height === 0) return false;
        const style = window.getComputedStyle(el);
        return style.display !== 'none' && style.visibility !== 'hidden' && style.opacity !== '0';
    };

    const implicitRole = (el) => {
        const explicit = el.getAttribute('role');
        if (explicit) return explicit;
        const tag = el.tagName.toLowerCase();
        const type = (el.getAttribute('type') || '').toLowerCase();
        if (tag === 'button') return 'button';
        if (tag === 'a' && el.hasAttribute('href')) return 'link';
        if (tag === 'select') return 'combobox';
        if (tag === 'textarea') return 'textbox';
        if (/^h[1-6]$/.test(tag)) return 'heading';
        if (tag === 'input') {
            if (['submit', 'button', 'reset'].includes(type)) return 'button';
            if (type === 'checkbox') return 'checkbox';
            if (type === 'radio') return 'radio';
            return 'textbox';
        }
        return '';
    };

    const hook = (el) => {
        if (!el || !el.tagName) return '';
        if (el.id) return '#' + CSS.escape(el.id);
        const testId = el.getAttribute('data-testid');
        if (testId) return `[data-testid="${testId}"]`;
        return '';
    };

    const absoluteXPath = (el) => {
        const parts = [];
        let node = el;
        while (node && node.nodeType === Node.ELEMENT_NODE) {
            let index = 1;
            let sib = node.previousElementSibling;
            while (sib) {
                if (sib.tagName === node.tagName) index++;
                sib = sib.previousElementSibling;
            }
            parts.unshift(node.tagName.toLowerCase() + '[' + index + ']');
            node = node.parentElement;
        }
        return '/' + parts.join('/');
    };

    const labelFor = (el) => {
        const tag = el.tagName.toLowerCase();
        if (!['input', 'select', 'textarea'].includes(tag)) return null;
        if (el.id) {
            const explicit = document.querySelector(`label[for="${CSS.escape(el.id)}"]`);
            if (explicit && norm(explicit.textContent)) {
                return { text: norm(explicit.textContent), source: 'for_attribute' };
            }
        }
        const wrapping = el.closest('label');
        if (wrapping && norm(wrapping.textContent)) {
            return { text: norm(wrapping.textContent), source: 'wrapping' };
        }
        const aria = el.getAttribute('aria-label');
        if (aria) return { text: norm(aria), source: 'aria_label' };
        const prev = el.previousElementSibling;
        if (prev && ['label', 'span', 'strong', 'b', 'div'].includes(prev.tagName.toLowerCase())) {
            const text = norm(prev.textContent);
            if (text && text.length <= 40) return { text, source: 'preceding_sibling' };
        }
        return null;
    };

    const tableCell = (el) => {
        const cell = el.closest('td, th');
        if (!cell) return null;
        const row = cell.parentElement;
        const table = cell.closest('table');
        if (!row || !table) return null;
        const rows = Array.from((row.parentElement || table).children).filter(r => r.tagName === 'TR');
        return {
            table_selector: hook(table),
            row: rows.indexOf(row) + 1,
            column: cell.cellIndex + 1,
            cell_text: norm(cell.textContent).slice(0, 100),
        };
    };

    const listItem = (el) => {
        const li = el.closest('li');
        if (!li || !li.parentElement) return null;
        const items = Array.from(li.parentElement.children).filter(c => c.tagName === 'LI');
        return { list_selector: hook(li.parentElement), position: items.indexOf(li) + 1 };
    };

    const shadowHosts = (el) => {
        const hosts = [];
        let root = el.getRootNode();
        while (root instanceof ShadowRoot) {
            const host = root.host;
            hosts.unshift(hook(host) || host.tagName.toLowerCase());
            root = host.getRootNode();
        }
        return hosts;
    };

    const anchors = (el) => {
        const rect = el.getBoundingClientRect();
        const found = [];
        const candidates = document.querySelectorAll('[id], [data-testid], label, h1, h2, h3, h4, legend');
        for (const other of candidates) {
            if (other === el || other.contains(el) || el.contains(other)) continue;
            if (!isVisible(other)) continue;
            const r = other.getBoundingClientRect();
            const dx = (r.x + r.width / 2) - (rect.x + rect.width / 2);
            const dy = (r.y + r.height / 2) - (rect.y + rect.height / 2);
            if (Math.hypot(dx, dy) > 300) continue;
            const text = norm(other.textContent).slice(0, 40);
            const selector = hook(other) || (text ? `text="${text}"` : '');
            if (!selector) continue;
            found.push({
                selector,
                text,
                bounding_box: { x: r.x, y: r.y, width: r.width, height: r.height },
                distance: Math.hypot(dx, dy),
            });
        }
        found.sort((a, b) => a.distance - b.distance);
        return found.slice(0, 5).map(({ distance, ...rest }) => rest);
    };

    const describe = (el) => {
        const rect = el.getBoundingClientRect();
        const attributes = {};
        for (const attr of Array.from(el.attributes || [])) attributes[attr.name] = attr.value;
        let siblingIndex = 0;
        let sib = el.previousElementSibling;
        while (sib) {
            if (sib.tagName === el.tagName) siblingIndex++;
            sib = sib.previousElementSibling;
        }
        const parent = el.parentElement;
        return {
            tag_name: el.tagName.toLowerCase(),
            id: el.id || '',
            class_list: typeof el.className === 'string' ? el.className.split(/\s+/).filter(Boolean) : [],
            name: el.getAttribute('name') || '',
            attributes,
            text_content: norm(el.innerText || el.textContent || el.value || '').slice(0, 100),
            bounding_box: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
            visible: isVisible(el),
            sibling_index: siblingIndex,
            role: implicitRole(el),
            aria_label: el.getAttribute('aria-label') || '',
            parent_tag: parent ? parent.tagName.toLowerCase() : '',
            parent_class: parent && typeof parent.className === 'string' ? parent.className : '',
            parent_id: parent ? parent.id || '' : '',
            absolute_xpath: absoluteXPath(el),
            label: labelFor(el),
            table_cell: tableCell(el),
            list_item: listItem(el),
            shadow_hosts: shadowHosts(el),
            anchors: anchors(el),
        };
    };

    // ---- selector resolution ----

    // Matches in the scope's light tree, its own shadow root and every
    // shadow root nested below either
    const deepQueryAll = (root, css) => {
        const out = [];
        const visit = (node) => {
            for (const el of node.querySelectorAll(css)) if (!out.includes(el)) out.push(el);
            for (const child of node.querySelectorAll('*')) {
                if (child.shadowRoot) visit(child.shadowRoot);
            }
        };
        visit(root);
        if (root.shadowRoot) visit(root.shadowRoot);
        return out;
    };

    const unquote = (s) => {
        const m = /^"(.*)"$/.exec(s.trim());
        return m ? { value: m[1], exact: true } : { value: s.trim(), exact: false };
    };

    const textMatches = (el, matcher) => {
        const text = norm(el.innerText || el.textContent);
        return matcher.exact ? text === matcher.value : text.toLowerCase().includes(matcher.value.toLowerCase());
    };

    const layout = {
        below: (r, a) => r.top >= a.bottom - 1,
        above: (r, a) => r.bottom <= a.top + 1,
        'right-of': (r, a) => r.left >= a.right - 1,
        'left-of': (r, a) => r.right <= a.left + 1,
    };

    const resolvePart = (scopes, part) => {
        const results = [];
        const push = (els) => { for (const e of els) if (!results.includes(e)) results.push(e); };
        const nth = /^nth=(-?\d+)$/.exec(part);
        if (nth) {
            const i = parseInt(nth[1], 10);
            const picked = i < 0 ? scopes[scopes.length + i] : scopes[i];
            return picked ? [picked] : [];
        }
        for (const scope of scopes) {
            if (part.startsWith('xpath=') || part.startsWith('//') || part.startsWith('(')) {
                const expr = part.startsWith('xpath=') ? part.slice(6) : part;
                const snap = document.evaluate(expr, scope, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                const els = [];
                for (let i = 0; i < snap.snapshotLength; i++) els.push(snap.snapshotItem(i));
                push(els);
            } else if (part.startsWith('text=')) {
                const matcher = unquote(part.slice(5));
                const all = deepQueryAll(scope, '*').filter(e => textMatches(e, matcher));
                push(all.filter(e => !all.some(o => o !== e && e.contains(o))));
            } else if (part.startsWith('role=')) {
                const m = /^role=([\w-]+)(?:\[name=(".*")\])?$/.exec(part);
                if (!m) throw new Error('bad role selector: ' + part);
                const name = m[2] ? unquote(m[2]) : null;
                push(deepQueryAll(scope, '*').filter(e => implicitRole(e) === m[1] &&
                    (!name || norm(e.getAttribute('aria-label') || e.innerText || e.textContent) === name.value)));
            } else if (part.startsWith('internal:label=')) {
                const matcher = unquote(part.slice('internal:label='.length));
                push(deepQueryAll(scope, 'input, select, textarea').filter(e => {
                    const label = labelFor(e);
                    return label && (matcher.exact ? label.text === matcher.value : label.text.includes(matcher.value));
                }));
            } else {
                const lay = /^(.*):(below|above|right-of|left-of)\((.*)\)$/.exec(part);
                if (lay) {
                    const anchor = resolveChain(lay[3])[0];
                    if (!anchor) continue;
                    const a = anchor.getBoundingClientRect();
                    const ac = [a.x + a.width / 2, a.y + a.height / 2];
                    const els = deepQueryAll(scope, lay[1] || '*')
                        .filter(e => e !== anchor && layout[lay[2]](e.getBoundingClientRect(), a));
                    const dist = (e) => {
                        const r = e.getBoundingClientRect();
                        return Math.hypot(r.x + r.width / 2 - ac[0], r.y + r.height / 2 - ac[1]);
                    };
                    push(els.sort((x, y) => dist(x) - dist(y)));
                    continue;
                }
                const hasText = /^(.*):has-text\((".*")\)$/.exec(part);
                if (hasText) {
                    const matcher = { value: unquote(hasText[2]).value, exact: false };
                    push(deepQueryAll(scope, hasText[1] || '*').filter(e => textMatches(e, matcher)));
                    continue;
                }
                push(deepQueryAll(scope, part.startsWith('css=') ? part.slice(4) : part));
            }
        }
        return results;
    };

    const resolveChain = (selector) => {
        let scopes = [document];
        for (const part of selector.split(' >> ').map(p => p.trim())) {
            scopes = resolvePart(scopes, part);
            if (scopes.length === 0) break;
        }
        return scopes;
    };

    // ---- event capture ----

    const send = (event) => {
        if (window.__playscribePaused) return;
        if (typeof __playscribeCapture === 'function') {
            __playscribeCapture(JSON.stringify(Object.assign({ epoch_ms: Date.now() }, event)));
        }
    };

    const elementEvent = (type, el, extra) => {
        send(Object.assign({ type, handle: register(el), element: describe(el) }, extra || {}));
    };

    document.addEventListener('click', (e) => {
        const el = e.target.closest('a, button, input, select, textarea, label, [role], [onclick]') || e.target;
        elementEvent('click', el);
    }, true);

    const inputTimers = new WeakMap();
    document.addEventListener('input', (e) => {
        const el = e.target;
        if (el.tagName !== 'INPUT' && el.tagName !== 'TEXTAREA') return;
        const at = Date.now();
        clearTimeout(inputTimers.get(el));
        inputTimers.set(el, setTimeout(() => elementEvent('input', el, { value: el.value, epoch_ms: at }), 300));
    }, true);

    document.addEventListener('change', (e) => {
        const el = e.target;
        if (el.tagName === 'SELECT') elementEvent('select', el, { value: el.value });
    }, true);

    document.addEventListener('submit', (e) => elementEvent('submit', e.target), true);

    const specialKeys = ['Enter', 'Tab', 'Escape', 'Backspace', 'Delete', 'ArrowUp', 'ArrowDown', 'ArrowLeft', 'ArrowRight'];
    document.addEventListener('keydown', (e) => {
        if (specialKeys.includes(e.key)) send({ type: 'keypress', key: e.key });
    }, true);

    let hoverTimer = null;
    document.addEventListener('mouseover', (e) => {
        const el = e.target.closest('[aria-haspopup], [role="menuitem"], nav a, .dropdown, [data-hover]');
        const at = Date.now();
        clearTimeout(hoverTimer);
        if (el) hoverTimer = setTimeout(() => elementEvent('hover', el, { epoch_ms: at }), 500);
    }, true);

    window.__playscribe = {
        register,
        describe: (id) => {
            const el = handles.get(id);
            if (!el || !el.isConnected) throw new Error('element ' + id + ' is detached');
            return describe(el);
        },
        resolve: (selector) => resolveChain(selector).map(register),
    };
    return true;
})()
"#;

/// Expression that extracts the descriptor of a registered element
pub fn describe_expression(handle: u64) -> String {
    format!("window.__playscribe.describe({})", handle)
}

/// Expression that resolves a selector to the handles of its matches
pub fn resolve_expression(selector: &str) -> String {
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    format!("window.__playscribe.resolve({})", literal)
}
