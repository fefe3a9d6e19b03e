pub use enclose::*;

/// Builds an observer closure, cloning the listed captures first.
///
/// An observer that reads its own flow should capture a weak handle from
/// [`Flow::downgrade`](crate::rc::Flow::downgrade). A captured `Flow` clone
/// keeps the flow alive until the subscription is cancelled.
///
/// ```
/// use flow::observer;
/// use flow::rc::Flow;
///
/// let flow = Flow::new(1);
/// let weak = flow.downgrade();
/// let subscription = flow.subscribe(observer!((weak) => {
///     if let Some(flow) = weak.upgrade() {
///         assert_eq!(flow.get_snapshot(), 2);
///     }
/// }));
///
/// flow.emit(2).unwrap();
/// subscription.cancel();
/// ```
#[macro_export]
macro_rules! observer {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::macros::enclose!(($( $d_tt )*) move || { $($b)* })
    };
    (=> $($b:tt)*) => {
        move || { $($b)* }
    };
}
