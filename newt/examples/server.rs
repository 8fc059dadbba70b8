use newt::config::{Message, Std};
use newt::core::Core;
use newt::net::Socket;
use newt::req::Method;
use newt::resource::{Node, NodeId};
use newt::resp::Reply;
use newt::std::{no_std_addr, Clock};

fn time_handler(_req: &Message<Std>, reply: &mut Reply<Std>) {
  reply.resp.set_payload(b"12:00".iter().copied());
}

fn main() {
  simple_logger::SimpleLogger::new().init().unwrap();

  let local = no_std_addr("0.0.0.0:5683".parse().unwrap());
  let sock = <std::net::UdpSocket as Socket>::bind(local).unwrap();
  let mut server = Core::<Std>::new(Clock::new(), sock);

  let tree = server.resources_mut().unwrap();
  tree.add_child(NodeId::ROOT,
                 Node::new("time").on(Method::Get, time_handler)
                                  .describe(r#"title="clock""#));

  log::info!("serving coap://0.0.0.0:5683/time");

  loop {
    if let Err(e) = server.run() {
      log::error!("{:?}", e);
    }

    std::thread::sleep(std::time::Duration::from_millis(10));
  }
}
