// src/config/defaults.rs

//! Built-in task table, used when no `Sitepipe.toml` exists.
//!
//! Templated pages, stylesheets and scripts go through the usual Node tools via
//! `npx`; everything else is copied. A task whose globs match nothing is a
//! no-op, so projects without `.pug` or `.ts` sources never invoke those tools.
//! Style and script processors emit inline source maps (postcss does so by
//! default), which the final `sourcemap` step writes out as `.map` files.

use crate::config::loader::load_from_str;
use crate::config::model::RawConfigFile;
use crate::errors::Result;

pub const BUILTIN_CONFIG: &str = r#"
[config]
out_dir = "dist"
debounce_ms = 50

[server]
port = 8888
live_reload = true

[task.html]
src = ["src/*.html"]
dest = "dist"

[task.pug]
src = ["src/*.pug"]
dest = "dist"
pipeline = [
    { kind = "command", cmd = "npx pug --pretty", extension = "html" },
]

[task.css]
src = ["src/css/*.css"]
dest = "dist/css"
pipeline = [
    { kind = "command", cmd = "npx postcss --use precss --use autoprefixer" },
    { kind = "purge", content = ["src/*.html"] },
    { kind = "sourcemap" },
]

[task.csslib]
src = ["src/csslib/*.css"]
dest = "dist/css"

[task.js]
src = ["src/js/*.js"]
dest = "dist/js"
pipeline = [
    { kind = "command", cmd = "npx babel --presets @babel/preset-env --source-maps inline --filename \"$SITEPIPE_FILE\"" },
    { kind = "sourcemap" },
]

[task.ts]
src = ["src/js/*.ts"]
dest = "dist/js"
pipeline = [
    { kind = "command", cmd = "npx esbuild --loader=ts --sourcemap=inline", extension = "js" },
    { kind = "command", cmd = "npx babel --presets @babel/preset-env --source-maps inline --filename \"$SITEPIPE_FILE\"" },
    { kind = "sourcemap" },
]

[task.jslib]
src = ["src/jslib/*.js"]
dest = "dist/js"

[task.images]
src = ["src/images/**/*"]
dest = "dist/images"

[task.data]
src = ["src/data/**/*"]
dest = "dist/data"

[task.fonts]
src = ["src/fonts/**/*"]
dest = "dist/fonts"

[[watch]]
glob = "src/*.html"
run = "html"

[[watch]]
glob = "src/**/*.pug"
run = "pug"

[[watch]]
glob = "src/css/*.css"
run = "css"

[[watch]]
glob = "src/csslib/*.css"
run = "csslib"

[[watch]]
glob = "src/js/*.js"
run = "js"

[[watch]]
glob = "src/js/*.ts"
run = "ts"

[[watch]]
glob = "src/jslib/*.js"
run = "jslib"

[[watch]]
glob = "src/images/**/*"
run = "images"

[[watch]]
glob = "src/data/**/*"
run = "data"

[[watch]]
glob = "src/fonts/**/*"
run = "fonts"
"#;

pub fn builtin_raw_config() -> Result<RawConfigFile> {
    load_from_str(BUILTIN_CONFIG)
}
