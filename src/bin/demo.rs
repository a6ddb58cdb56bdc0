// Licensed under the Apache License, Version 2.0. See LICENSE.

//! A smoke-test binary exercising the core end to end: builds an `EditBuffer`,
//! wraps its text buffer in an `EditorView`, draws a frame into a `Renderer`'s
//! back buffer, and renders once. Not a CLI surface for the library — the library
//! itself exposes none.

use std::time::Duration;

use clap::Parser;
use mimalloc::MiMalloc;

use opentui_core::buffer::{BorderChars, BoxOptions};
use opentui_core::cell::{Attrs, Rgba};
use opentui_core::config::{OutputMode, RendererConfig};
use opentui_core::edit_buffer::EditBuffer;
use opentui_core::view::{EditorView, WrapMode};
use opentui_core::{Renderer, WidthPolicy};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser, Debug)]
#[command(about = "opentui_core smoke test: draws one frame and exits")]
struct Args {
    /// Text to load into the edit buffer before rendering.
    #[arg(long, default_value = "Hello, opentui_core! 👋 🦜")]
    text: String,

    /// Render in buffered mode instead of writing straight to the TTY.
    #[arg(long)]
    buffered: bool,
}

fn main() {
    let _guard = opentui_core::logging::init_tracing(std::env::temp_dir(), false);

    let args = Args::parse();

    let mut edit = EditBuffer::new(WidthPolicy::Unicode, Duration::from_millis(500));
    if let Err(err) = edit.set_text(&args.text) {
        eprintln!("set_text failed: {err}");
        return;
    }

    let mut view = EditorView::new(WidthPolicy::Unicode);
    view.set_wrap_mode(WrapMode::Word);
    view.set_wrap_width(Some(36));
    view.set_viewport_size(36, 8);
    let line_count = view.get_total_virtual_line_count(edit.text_buffer());

    let mut config = RendererConfig::default();
    if args.buffered {
        config.output_mode = OutputMode::Buffered;
    }
    let mut renderer = Renderer::new(40, 10, config);

    {
        let back = renderer.back_buffer();
        back.clear(Rgba::BLACK);
        back.draw_box(0, 0, 40, 10, BorderChars::SINGLE, BoxOptions::all(), Rgba::WHITE, Rgba::BLACK, Some("opentui_core"));
        back.draw_text(&edit.get_text(), 2, 2, Rgba::WHITE, Some(Rgba::BLACK), Some(Attrs::BOLD));
    }

    match renderer.render() {
        Ok(()) => {
            if args.buffered {
                match renderer.drain() {
                    Ok(frame) => println!("rendered {} bytes across {line_count} wrapped line(s)", frame.bytes.len()),
                    Err(err) => eprintln!("drain failed: {err}"),
                }
            } else {
                println!("frame rendered ({line_count} wrapped line(s))");
            }
        }
        Err(err) => eprintln!("render failed: {err}"),
    }

    renderer.destroy();
    edit.destroy();
}
