//! DomFeed: `ChangeFeed` over `MutationObserver`

use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{MutationObserver, MutationObserverInit, MutationRecord, Node};

use crate::annotator::error::AnnotateError;
use crate::annotator::tree::{ChangeFeed, ChangeRecord, ObserveOptions};

/// Receives every converted batch
pub type BatchSink = Rc<dyn Fn(Vec<ChangeRecord<Node>>)>;

/// A live observer. Disconnects when dropped.
pub struct DomSubscription {
    observer: MutationObserver,
    _callback: Closure<dyn FnMut(js_sys::Array)>,
}

impl Drop for DomSubscription {
    fn drop(&mut self) {
        self.observer.disconnect();
    }
}

pub struct DomFeed {
    sink: BatchSink,
}

impl DomFeed {
    pub fn new(sink: BatchSink) -> Self {
        Self { sink }
    }
}

/// Convert raw observer records; unknown record types are dropped
pub fn convert_records(records: &js_sys::Array) -> Vec<ChangeRecord<Node>> {
    let mut out = Vec::with_capacity(records.length() as usize);
    for value in records.iter() {
        let Ok(record) = value.dyn_into::<MutationRecord>() else {
            continue;
        };
        let Some(target) = record.target() else {
            continue;
        };
        match record.type_().as_str() {
            "childList" => {
                let list = record.added_nodes();
                let added = (0..list.length()).filter_map(|i| list.item(i)).collect();
                out.push(ChangeRecord::ChildList { target, added });
            }
            "characterData" => out.push(ChangeRecord::CharacterData { target }),
            _ => {}
        }
    }
    out
}

impl ChangeFeed for DomFeed {
    type Node = Node;
    type Subscription = DomSubscription;

    fn subscribe(&mut self, root: &Node, options: ObserveOptions) -> Result<DomSubscription, AnnotateError> {
        let sink = Rc::clone(&self.sink);
        let callback = Closure::<dyn FnMut(js_sys::Array)>::new(move |records: js_sys::Array| {
            let batch = convert_records(&records);
            if !batch.is_empty() {
                sink(batch);
            }
        });

        let observer = MutationObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| AnnotateError::rejected(format!("observer creation failed: {:?}", e)))?;

        let init = MutationObserverInit::new();
        init.set_child_list(options.child_list);
        init.set_subtree(options.subtree);
        init.set_character_data(options.character_data);
        observer
            .observe_with_options(root, &init)
            .map_err(|e| AnnotateError::rejected(format!("observe failed: {:?}", e)))?;

        Ok(DomSubscription {
            observer,
            _callback: callback,
        })
    }

    fn unsubscribe(&mut self, subscription: DomSubscription) {
        drop(subscription);
    }
}
