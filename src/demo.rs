//! 演示会话
//!
//! 一份脚本化的文档和操作序列，二进制与测试共用。

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{Document, DocumentInfo, NodeId, NodeRef};
use crate::error::RecordError;
use crate::event::{
    EventLog, IncrementalData, InputData, InputValue, MediaAct, MediaInteractionData,
    MouseInteraction, MouseInteractionData, MouseMoveData, MousePosition, RuleAdd, ScrollData,
    StyleSheetRuleData, ViewportResizeData,
};
use crate::record::{RecordOptions, Recorder};
use crate::timer::{ManualClock, Millis};
use tracing::info;

pub const DEMO_HREF: &str = "https://demo.local/app/index.html";

/// 演示录制选项
#[derive(Debug, Clone)]
pub struct DemoOpts {
    pub checkout_every_nth: Option<u32>,
    pub checkout_every_nms: Option<i64>,
    /// 会话起始时间（Unix 毫秒）
    pub start_ms: i64,
    /// 相邻两步操作的间隔
    pub step_ms: i64,
}

impl Default for DemoOpts {
    fn default() -> Self {
        Self {
            checkout_every_nth: None,
            checkout_every_nms: None,
            start_ms: 1_700_000_000_000,
            step_ms: 100,
        }
    }
}

/// 演示文档里后续脚本会用到的节点
#[derive(Debug, Clone, Copy)]
pub struct DemoNodes {
    pub head_style: NodeRef,
    pub title: NodeRef,
    pub list: NodeRef,
    pub items: [NodeRef; 3],
    pub note: NodeRef,
    pub input: NodeRef,
    pub button: NodeRef,
    pub video: NodeRef,
}

/// 构建演示文档
///
/// ```text
/// <!DOCTYPE html>
/// <html><head><style/></head>
/// <body><h1/><ul><li/>x3</ul><p/><input/><button/><video/></body></html>
/// ```
pub fn build_demo_document() -> (Document, DemoNodes) {
    let mut doc = Document::new(DocumentInfo {
        href: DEMO_HREF.to_string(),
        ..DocumentInfo::default()
    });
    let root = doc.root();
    let doctype = doc.create_doctype("html", "", "");
    let html = doc.create_element("html");
    let head = doc.create_element("head");
    let head_style = doc.create_element("style");
    let css = doc.create_text("h1 { color: navy; }");
    let body = doc.create_element("body");
    let title = doc.create_element("h1");
    let title_text = doc.create_text("Session replay");
    let list = doc.create_element("ul");
    let items = ["alpha", "beta", "gamma"].map(|label| {
        let li = doc.create_element("li");
        let t = doc.create_text(label);
        let _ = doc.append_child(li, t);
        let _ = doc.set_attribute(li, "data-label", label);
        li
    });
    let note = doc.create_text("nothing selected");
    let p = doc.create_element("p");
    let input = doc.create_element("input");
    let button = doc.create_element("button");
    let button_text = doc.create_text("Save");
    let video = doc.create_element("video");

    let edges = [
        (root, doctype),
        (root, html),
        (html, head),
        (head, head_style),
        (head_style, css),
        (html, body),
        (body, title),
        (title, title_text),
        (body, list),
        (list, items[0]),
        (list, items[1]),
        (list, items[2]),
        (body, p),
        (p, note),
        (body, input),
        (body, button),
        (button, button_text),
        (body, video),
    ];
    for (parent, child) in edges {
        let _ = doc.append_child(parent, child);
    }
    let _ = doc.set_attribute(input, "type", "text");
    let _ = doc.set_attribute(video, "src", "https://cdn.demo.local/clip.mp4");

    let nodes = DemoNodes {
        head_style,
        title,
        list,
        items,
        note,
        input,
        button,
        video,
    };
    (doc, nodes)
}

fn id_of(recorder: &Recorder, node: NodeRef) -> NodeId {
    recorder.mirror().live_id(node).unwrap_or(NodeId(0))
}

/// 录制一段脚本化会话，返回源文档的最终状态和事件日志。
#[tracing::instrument(skip(opts))]
pub fn record_demo(opts: &DemoOpts) -> Result<(Document, EventLog), RecordError> {
    let (mut doc, nodes) = build_demo_document();
    let clock = ManualClock::new(Millis(opts.start_ms));
    let step = Millis(opts.step_ms);
    let log = Rc::new(RefCell::new(EventLog::default()));

    let sink = Rc::clone(&log);
    let mut options = RecordOptions::new(move |ev, is_checkpoint| {
        sink.borrow_mut().push(ev.clone(), is_checkpoint);
    });
    options.checkout_every_nth = opts.checkout_every_nth;
    options.checkout_every_nms = opts.checkout_every_nms;

    let mut recorder = Recorder::new(options, clock.clone());
    recorder.start(&mut doc)?;

    // 1. 新增一个列表项，同时改标题属性
    clock.advance(step);
    let delta = doc.create_element("li");
    let delta_text = doc.create_text("delta");
    let _ = doc.append_child(delta, delta_text);
    let _ = doc.append_child(nodes.list, delta);
    let _ = doc.set_attribute(nodes.title, "class", "highlight");
    recorder.flush(&mut doc)?;

    // 2. 把第一项移到末尾
    clock.advance(step);
    let _ = doc.append_child(nodes.list, nodes.items[0]);
    recorder.flush(&mut doc)?;

    // 3. 文本变更，外加一条新旧值相同的通知
    clock.advance(step);
    let _ = doc.set_data(nodes.note, "beta selected");
    let _ = doc.set_attribute(nodes.button, "type", "button");
    let _ = doc.set_attribute(nodes.button, "type", "button");
    recorder.flush(&mut doc)?;

    // 4. 指针划过标题
    clock.advance(step);
    let title_id = id_of(&recorder, nodes.title);
    let positions = [(10, 12, -40), (40, 18, -20), (80, 20, 0)]
        .map(|(x, y, time_offset)| MousePosition {
            x,
            y,
            id: title_id,
            time_offset,
        })
        .to_vec();
    recorder.record_incremental(
        &mut doc,
        IncrementalData::MouseMove(MouseMoveData { positions }),
    )?;

    // 5. 聚焦输入框并输入
    clock.advance(step);
    let input_id = id_of(&recorder, nodes.input);
    recorder.record_incremental(
        &mut doc,
        IncrementalData::MouseInteraction(MouseInteractionData {
            act: MouseInteraction::Focus,
            id: input_id,
            x: 0,
            y: 0,
        }),
    )?;
    clock.advance(step);
    recorder.record_incremental(
        &mut doc,
        IncrementalData::Input(InputData {
            id: input_id,
            value: InputValue::Text("hello".to_string()),
        }),
    )?;

    // 6. 点击按钮
    clock.advance(step);
    let button_id = id_of(&recorder, nodes.button);
    recorder.record_incremental(
        &mut doc,
        IncrementalData::MouseInteraction(MouseInteractionData {
            act: MouseInteraction::Click,
            id: button_id,
            x: 120,
            y: 300,
        }),
    )?;

    // 7. 同一批里新增又删除的临时节点不会出现在流里
    clock.advance(step);
    let body = doc.find_element("body").unwrap_or(doc.root());
    let toast = doc.create_element("div");
    let _ = doc.append_child(body, toast);
    let _ = doc.remove_child(body, toast);
    recorder.flush(&mut doc)?;

    // 8. 删除第二项
    clock.advance(step);
    let _ = doc.remove_child(nodes.list, nodes.items[1]);
    recorder.flush(&mut doc)?;

    // 9. 滚动窗口、插入样式规则、调整视口
    clock.advance(step);
    let root_id = id_of(&recorder, doc.root());
    if let Some(state) = doc.state_mut(doc.root()) {
        state.scroll_top = 240;
    }
    recorder.record_incremental(
        &mut doc,
        IncrementalData::Scroll(ScrollData {
            id: root_id,
            x: 0,
            y: 240,
        }),
    )?;
    clock.advance(step);
    let rule = "li { margin: 4px; }";
    let _ = doc.insert_rule(nodes.head_style, rule, None);
    let style_id = id_of(&recorder, nodes.head_style);
    recorder.record_incremental(
        &mut doc,
        IncrementalData::StyleSheetRule(StyleSheetRuleData {
            id: style_id,
            adds: Some(vec![RuleAdd {
                rule: rule.to_string(),
                index: None,
            }]),
            removes: None,
        }),
    )?;
    clock.advance(step);
    doc.info_mut().width = 1024;
    doc.info_mut().height = 768;
    recorder.record_incremental(
        &mut doc,
        IncrementalData::ViewportResize(ViewportResizeData {
            width: 1024,
            height: 768,
        }),
    )?;

    // 10. 自定义事件与媒体播放
    clock.advance(step);
    recorder.add_custom_event("checkout", serde_json::json!({ "cart": 3 }))?;
    clock.advance(step);
    let video_id = id_of(&recorder, nodes.video);
    recorder.record_incremental(
        &mut doc,
        IncrementalData::MediaInteraction(MediaInteractionData {
            act: MediaAct::Play,
            id: video_id,
        }),
    )?;

    recorder.stop(&mut doc)?;
    drop(recorder);

    let log = std::mem::take(&mut *log.borrow_mut());
    info!(
        events = log.events.len(),
        checkpoints = log.checkpoints,
        "📼 演示会话录制完成"
    );
    Ok((doc, log))
}
